use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use lattice_core::config::RegistryConfig;
use lattice_core::kernel::constants::CLI_DISABLE_REASON;
use lattice_core::plugin_system::filter::FeatureFlags;
use lattice_core::plugin_system::{
    PluginBundle, PluginInfoEntry, PluginManifest, PluginRegistry, StaticEntryModule, StaticPluginLoader,
};
use lattice_core::{Application, KernelError};
use log::{info, warn};

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Plugin manifest (JSON); repeat for several plugins
    #[arg(long = "manifest", value_name = "FILE", required = true)]
    pub manifests: Vec<PathBuf>,

    /// Enable a loaded plugin
    #[arg(long = "enable", value_name = "NAME")]
    pub enable: Vec<String>,

    /// Disable a loaded plugin
    #[arg(long = "disable", value_name = "NAME")]
    pub disable: Vec<String>,

    /// Set a feature flag
    #[arg(long = "flag", value_name = "KEY=BOOL", value_parser = parse_flag)]
    pub flags: Vec<(String, bool)>,
}

/// Parse `KEY=BOOL` into a flag assignment.
pub fn parse_flag(raw: &str) -> Result<(String, bool), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=BOOL, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing flag name in '{raw}'"));
    }
    let value = match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => true,
        "false" | "0" | "off" | "no" => false,
        other => return Err(format!("'{other}' is not a boolean")),
    };
    Ok((key.to_string(), value))
}

fn manifest_url(path: &Path) -> String {
    format!("file://{}", path.display())
}

/// Serve every manifest file through `loader`; unreadable or invalid files
/// become load failures named after the file stem.
fn stage_manifests(loader: &StaticPluginLoader, paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|path| {
            let url = manifest_url(path);
            let parsed = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read manifest {}: {e}", path.display()))
                .and_then(|content| PluginManifest::from_json_str(&content).map_err(|e| e.to_string()));

            match parsed {
                Ok(manifest) => loader.register_bundle(
                    url.clone(),
                    PluginBundle {
                        manifest,
                        entry_module: Arc::new(StaticEntryModule::new()),
                    },
                ),
                Err(message) => {
                    let plugin_name = path
                        .file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string());
                    warn!("{message}");
                    loader.register_failure(url.clone(), Some(plugin_name), message);
                }
            }
            url
        })
        .collect()
}

/// Load the manifests named in `args`, apply the requested state changes and
/// describe the resulting registry.
pub async fn run_inspect(args: InspectArgs, config: RegistryConfig) -> Result<String, KernelError> {
    let mut app = Application::new(config)?;
    let loader = StaticPluginLoader::new();
    let urls = stage_manifests(&loader, &args.manifests);
    app.attach_loader(Arc::new(loader))?;
    app.start().await?;

    let registry = app.plugin_registry();
    for url in &urls {
        registry.load_plugin(url, None).await?;
    }

    if !args.flags.is_empty() {
        let flags: FeatureFlags = args.flags.into_iter().collect();
        registry.set_feature_flags(flags);
    }
    if !args.enable.is_empty() {
        let count = registry.enable_plugins(&args.enable);
        info!("Enabled {count} plugin(s)");
    }
    if !args.disable.is_empty() {
        let count = registry.disable_plugins(&args.disable, Some(CLI_DISABLE_REASON));
        info!("Disabled {count} plugin(s)");
    }

    let report = render_report(&registry);
    app.shutdown().await?;
    Ok(report)
}

pub fn render_report(registry: &PluginRegistry) -> String {
    let snapshot = registry.snapshot();
    let mut out = String::new();

    let _ = writeln!(out, "Plugins:");
    if snapshot.plugin_info.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for entry in snapshot.plugin_info.iter() {
        match entry {
            PluginInfoEntry::Loaded {
                plugin_name,
                metadata,
                enabled,
                disable_reason,
            } => {
                let state = match (enabled, disable_reason) {
                    (true, _) => "enabled".to_string(),
                    (false, Some(reason)) => format!("disabled ({reason})"),
                    (false, None) => "disabled".to_string(),
                };
                let _ = writeln!(out, "  {plugin_name} {} [{}] {state}", metadata.version, entry.status());
            }
            PluginInfoEntry::Failed {
                plugin_name,
                error_message,
                ..
            } => {
                let _ = writeln!(out, "  {plugin_name} [{}] {error_message}", entry.status());
            }
        }
    }

    let _ = writeln!(out, "Active extensions:");
    if snapshot.extensions.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for extension in snapshot.extensions.iter() {
        let _ = writeln!(out, "  {} {}", extension.uid, extension.extension_type);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("A=true"), Ok(("A".to_string(), true)));
        assert_eq!(parse_flag(" B = off "), Ok(("B".to_string(), false)));
        assert!(parse_flag("A").is_err());
        assert!(parse_flag("=true").is_err());
        assert!(parse_flag("A=maybe").is_err());
    }
}
