use std::fmt;

/// Events emitted by the plugin registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PluginEventType {
    /// Load state, enablement or disable reason of a plugin changed
    PluginInfoChanged,
    /// The list of extensions in use changed
    ExtensionsChanged,
    /// Feature flag values changed
    FeatureFlagsChanged,
}

impl PluginEventType {
    /// All event types, in declaration order
    pub const ALL: [PluginEventType; 3] = [
        PluginEventType::PluginInfoChanged,
        PluginEventType::ExtensionsChanged,
        PluginEventType::FeatureFlagsChanged,
    ];

    /// Get the name of this event
    pub fn name(&self) -> &'static str {
        match self {
            PluginEventType::PluginInfoChanged => "plugin.info_changed",
            PluginEventType::ExtensionsChanged => "plugin.extensions_changed",
            PluginEventType::FeatureFlagsChanged => "plugin.feature_flags_changed",
        }
    }
}

impl fmt::Display for PluginEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
