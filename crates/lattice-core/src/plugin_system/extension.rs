use crate::plugin_system::manifest::{ExtensionDescriptor, ExtensionFlags};
use crate::plugin_system::properties::{PropertyMap, PropertyValue};

/// An extension owned by a loaded plugin.
///
/// `uid` is `{plugin_name}[{index}]_{build_hash}`: unique across reloads of
/// the same plugin as long as the build hash changes.
#[derive(Debug, Clone)]
pub struct LoadedExtension {
    pub extension_type: String,
    pub properties: PropertyMap,
    pub flags: Option<ExtensionFlags>,
    pub plugin_name: String,
    pub uid: String,
}

impl LoadedExtension {
    pub fn from_descriptor(
        descriptor: ExtensionDescriptor,
        plugin_name: &str,
        index: usize,
        build_hash: &str,
    ) -> Self {
        Self {
            extension_type: descriptor.extension_type,
            properties: descriptor.properties,
            flags: descriptor.flags,
            plugin_name: plugin_name.to_string(),
            uid: extension_uid(plugin_name, index, build_hash),
        }
    }

    /// Copy of this extension carrying a different property tree
    pub fn with_properties(&self, properties: PropertyMap) -> Self {
        Self {
            extension_type: self.extension_type.clone(),
            properties,
            flags: self.flags.clone(),
            plugin_name: self.plugin_name.clone(),
            uid: self.uid.clone(),
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

pub fn extension_uid(plugin_name: &str, index: usize, build_hash: &str) -> String {
    format!("{plugin_name}[{index}]_{build_hash}")
}
