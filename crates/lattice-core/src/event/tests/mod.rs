
#[cfg(test)]
mod tests {
    use crate::event::PluginEventType;

    #[test]
    fn test_event_type_names() {
        assert_eq!(PluginEventType::PluginInfoChanged.name(), "plugin.info_changed");
        assert_eq!(PluginEventType::ExtensionsChanged.name(), "plugin.extensions_changed");
        assert_eq!(PluginEventType::FeatureFlagsChanged.name(), "plugin.feature_flags_changed");
        assert_eq!(PluginEventType::ExtensionsChanged.to_string(), "plugin.extensions_changed");
    }

    #[test]
    fn test_all_lists_every_type_once() {
        let mut all = PluginEventType::ALL.to_vec();
        all.dedup();
        assert_eq!(all.len(), 3);
    }
}
