//! # Lattice Core Plugin System Errors
//!
//! Defines error types specific to the plugin system.
//!
//! [`PluginSystemError`] covers registry and loader misuse (no loader, a
//! second loader, unknown plugin names) and manifest problems.
//! [`CodeRefError`] covers everything that can go wrong while loading the
//! code behind a `$codeRef`, including the aggregate
//! [`CodeRefError::Resolution`] that carries every individual cause.
// crates/lattice-core/src/plugin_system/error.rs
use crate::plugin_system::entry_module::ModuleLoadCause;
use crate::plugin_system::extension::LoadedExtension;

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    #[error("Plugin loader must be set before {operation}")]
    LoaderNotConnected { operation: String },

    #[error("Plugin loader is already set")]
    LoaderAlreadySet,

    #[error("Attempt to {operation} plugin {plugin_name} which is not loaded yet")]
    PluginNotLoaded {
        plugin_name: String,
        operation: String,
    },

    #[error("Plugin manifest error: {message}")]
    ManifestError {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error(transparent)]
    CodeRef(#[from] CodeRefError),
}

/// Failures raised while loading or resolving code references.
///
/// The single-reference variants carry a fully formatted `message` that
/// already names the extension (or plugin) the reference belongs to.
#[derive(Debug, thiserror::Error)]
pub enum CodeRefError {
    #[error("{message}")]
    Malformed { reference: String, message: String },

    #[error("{message}")]
    ModuleLoad {
        module_name: String,
        message: String,
        #[source]
        source: ModuleLoadCause,
    },

    #[error("{message}")]
    MissingExport {
        module_name: String,
        export_name: String,
        message: String,
    },

    #[error(
        "Failed to resolve {count} code reference(s) in extension {uid}",
        count = .causes.len(),
        uid = .extension.uid
    )]
    Resolution {
        extension: Box<LoadedExtension>,
        causes: Vec<CodeRefError>,
    },
}

impl CodeRefError {
    /// Individual causes of an aggregate failure; a single-reference error is its own cause.
    pub fn causes(&self) -> &[CodeRefError] {
        match self {
            CodeRefError::Resolution { causes, .. } => causes,
            other => std::slice::from_ref(other),
        }
    }
}
