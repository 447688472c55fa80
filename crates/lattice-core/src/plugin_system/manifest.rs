use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::properties::PropertyMap;

/// Feature flag conditions attached to an extension
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtensionFlags {
    /// Flags that must all be `true`
    pub required: BTreeSet<String>,
    /// Flags that must all be `false` (or unset)
    pub disallowed: BTreeSet<String>,
}

impl ExtensionFlags {
    pub fn required<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn disallowed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed.extend(names.into_iter().map(Into::into));
        self
    }
}

/// Extension as declared in a plugin manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionDescriptor {
    #[serde(rename = "type")]
    pub extension_type: String,
    #[serde(default)]
    pub properties: PropertyMap,
    #[serde(default)]
    pub flags: Option<ExtensionFlags>,
}

impl ExtensionDescriptor {
    pub fn new(extension_type: impl Into<String>) -> Self {
        Self {
            extension_type: extension_type.into(),
            properties: PropertyMap::new(),
            flags: None,
        }
    }

    /// Set properties from a JSON object; non-object values leave the properties empty.
    pub fn properties_json(mut self, value: serde_json::Value) -> Self {
        self.properties =
            crate::plugin_system::properties::property_map_from_json(value).unwrap_or_default();
        self
    }

    pub fn flags(mut self, flags: ExtensionFlags) -> Self {
        self.flags = Some(flags);
        self
    }
}

/// Represents a plugin manifest that describes a plugin
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    /// Unique identifier for the plugin
    pub name: String,

    /// Plugin version
    pub version: String,

    /// Plugin dependencies, name to version range (recorded, not checked)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    /// Identifier of this particular build
    #[serde(default)]
    pub build_hash: Option<String>,

    /// Declared extensions, in manifest order
    #[serde(default)]
    pub extensions: Vec<ExtensionDescriptor>,
}

impl PluginManifest {
    /// Create a new plugin manifest
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            dependencies: BTreeMap::new(),
            build_hash: None,
            extensions: Vec::new(),
        }
    }

    pub fn with_build_hash(mut self, build_hash: &str) -> Self {
        self.build_hash = Some(build_hash.to_string());
        self
    }

    pub fn with_dependency(mut self, name: &str, version_range: &str) -> Self {
        self.dependencies.insert(name.to_string(), version_range.to_string());
        self
    }

    pub fn with_extension(mut self, extension: ExtensionDescriptor) -> Self {
        self.extensions.push(extension);
        self
    }

    /// Parse and validate a JSON manifest
    pub fn from_json_str(content: &str) -> Result<Self, PluginSystemError> {
        let manifest: PluginManifest =
            serde_json::from_str(content).map_err(|e| PluginSystemError::ManifestError {
                message: format!("invalid manifest JSON: {e}"),
                source: Some(e),
            })?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> Result<(), PluginSystemError> {
        if self.name.trim().is_empty() {
            return Err(manifest_error("plugin name must not be empty"));
        }
        if self.version.trim().is_empty() {
            return Err(manifest_error(format!("plugin {} has an empty version", self.name)));
        }
        if let Some(index) = self
            .extensions
            .iter()
            .position(|e| e.extension_type.trim().is_empty())
        {
            return Err(manifest_error(format!(
                "extension {index} of plugin {} has an empty type",
                self.name
            )));
        }
        Ok(())
    }

    /// Immutable metadata snapshot kept for a loaded plugin
    pub fn metadata(&self) -> PluginMetadata {
        PluginMetadata {
            name: self.name.clone(),
            version: self.version.clone(),
            dependencies: self.dependencies.clone(),
        }
    }
}

fn manifest_error(message: impl Into<String>) -> PluginSystemError {
    PluginSystemError::ManifestError {
        message: message.into(),
        source: None,
    }
}

/// Runtime metadata of a loaded plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginMetadata {
    pub name: String,
    pub version: String,
    pub dependencies: BTreeMap<String, String>,
}
