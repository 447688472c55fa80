//! # Lattice Core Configuration
//!
//! Startup settings for the plugin registry, read from JSON, YAML or TOML.
//! The format is picked from the file extension; YAML and TOML support sit
//! behind the `yaml-config` and `toml-config` features (both on by default).
//!
//! ```toml
//! auto_enable_loaded_plugins = false
//!
//! [feature_flags]
//! TELEMETRY = true
//! ```
pub mod error;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::plugin_system::filter::FeatureFlags;
use crate::plugin_system::registry::PluginRegistryOptions;

pub use error::ConfigError;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Registry settings applied when the application is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Enable plugins as soon as the loader reports them loaded
    pub auto_enable_loaded_plugins: bool,
    /// Initial feature flags; entries that are not booleans are ignored
    pub feature_flags: BTreeMap<String, serde_json::Value>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auto_enable_loaded_plugins: true,
            feature_flags: BTreeMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(e, "read_to_string", path.to_path_buf()))?;
        log::debug!("Loading registry configuration from {}", path.display());
        Self::from_str(&content, format)
    }

    pub fn from_str(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(error::json_error),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => {
                // An empty YAML document means "all defaults"
                if content.trim().is_empty() {
                    return Ok(Self::default());
                }
                serde_yaml::from_str(content).map_err(error::yaml_error)
            }
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(content).map_err(error::toml_error),
        }
    }

    /// The boolean entries of `feature_flags`
    pub fn initial_flags(&self) -> FeatureFlags {
        self.feature_flags
            .iter()
            .filter_map(|(name, value)| value.as_bool().map(|b| (name.clone(), b)))
            .collect()
    }

    pub fn to_options(&self) -> PluginRegistryOptions {
        PluginRegistryOptions {
            auto_enable_loaded_plugins: self.auto_enable_loaded_plugins,
            ..PluginRegistryOptions::default()
        }
    }
}

#[cfg(test)]
mod tests;
