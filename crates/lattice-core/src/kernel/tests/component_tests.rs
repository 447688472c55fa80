use std::sync::Arc;

use async_trait::async_trait;

use crate::kernel::component::{DependencyRegistry, KernelComponent};
use crate::kernel::error::Result;
use crate::plugin_system::PluginRegistry;

#[derive(Debug, Default)]
struct NoopComponent;

#[async_trait]
impl KernelComponent for NoopComponent {
    fn name(&self) -> &'static str {
        "NoopComponent"
    }
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }
    async fn start(&self) -> Result<()> {
        Ok(())
    }
    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_register_and_get_concrete() {
    let mut registry = DependencyRegistry::new();
    assert!(registry.is_empty());

    let plugin_registry = Arc::new(PluginRegistry::default());
    registry.register_instance(Arc::clone(&plugin_registry));
    registry.register_instance(Arc::new(NoopComponent));
    assert_eq!(registry.len(), 2);

    let fetched = registry.get_concrete::<PluginRegistry>().expect("registry component");
    assert!(Arc::ptr_eq(&fetched, &plugin_registry));
    assert!(registry.get_concrete::<NoopComponent>().is_some());
}

#[test]
fn test_replacing_instance_keeps_order() {
    let mut registry = DependencyRegistry::new();
    registry.register_instance(Arc::new(PluginRegistry::default()));
    registry.register_instance(Arc::new(NoopComponent));

    let replacement = Arc::new(PluginRegistry::default());
    registry.register_instance(Arc::clone(&replacement));
    assert_eq!(registry.len(), 2);

    let names: Vec<&str> = registry.components_in_order().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["PluginRegistry", "NoopComponent"]);
    let fetched = registry.get_concrete::<PluginRegistry>().expect("registry component");
    assert!(Arc::ptr_eq(&fetched, &replacement));
}

#[test]
fn test_get_missing_component() {
    let registry = DependencyRegistry::new();
    assert!(registry.get_concrete::<NoopComponent>().is_none());
}
