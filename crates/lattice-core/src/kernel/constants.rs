/// Application name
pub const APP_NAME: &str = "Lattice";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Key of the single field of an encoded code reference
pub const CODE_REF_KEY: &str = "$codeRef";

/// Export used when a code reference names only a module
pub const DEFAULT_EXPORT_NAME: &str = "default";

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "lattice.toml";

/// Reason recorded for plugins disabled through the CLI
pub const CLI_DISABLE_REASON: &str = "disabled from the command line";
