use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// A single exported binding of a plugin module
pub type ExportValue = Arc<dyn Any + Send + Sync>;

/// Opaque reason an entry module could not provide a module
pub type ModuleLoadCause = Box<dyn std::error::Error + Send + Sync>;

/// Produces the exported bindings of a module once it has been fetched
pub type ModuleFactory = Box<dyn FnOnce() -> PluginModule + Send>;

/// Exported bindings of one plugin module
#[derive(Clone, Default)]
pub struct PluginModule {
    exports: HashMap<String, ExportValue>,
}

impl PluginModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style export registration
    pub fn with_export<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.exports.insert(name.into(), Arc::new(value));
        self
    }

    pub fn insert_export(&mut self, name: impl Into<String>, value: ExportValue) {
        self.exports.insert(name.into(), value);
    }

    pub fn export(&self, name: &str) -> Option<ExportValue> {
        self.exports.get(name).cloned()
    }

    pub fn has_export(&self, name: &str) -> bool {
        self.exports.contains_key(name)
    }

    /// Downcast an export to its concrete type
    pub fn export_as<T: 'static>(&self, name: &str) -> Option<&T> {
        self.exports.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PluginModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginModule")
            .field("exports", &self.export_names())
            .finish()
    }
}

/// Runtime handle through which a plugin's modules are fetched by name
#[async_trait]
pub trait PluginEntryModule: Send + Sync {
    /// Fetch the module called `module_name`, returning a factory for its exports.
    async fn get(&self, module_name: &str) -> Result<ModuleFactory, ModuleLoadCause>;
}

type StaticModuleFn = Arc<dyn Fn() -> PluginModule + Send + Sync>;

/// Entry module backed by in-process module factories
#[derive(Clone, Default)]
pub struct StaticEntryModule {
    modules: HashMap<String, StaticModuleFn>,
}

impl StaticEntryModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expose a fixed set of exports under `module_name`
    pub fn with_module(mut self, module_name: impl Into<String>, module: PluginModule) -> Self {
        self.modules
            .insert(module_name.into(), Arc::new(move || module.clone()));
        self
    }

    /// Expose a module whose exports are built on every fetch
    pub fn with_module_factory<F>(mut self, module_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> PluginModule + Send + Sync + 'static,
    {
        self.modules.insert(module_name.into(), Arc::new(factory));
        self
    }

    pub fn module_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for StaticEntryModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticEntryModule")
            .field("modules", &self.module_names())
            .finish()
    }
}

#[async_trait]
impl PluginEntryModule for StaticEntryModule {
    async fn get(&self, module_name: &str) -> Result<ModuleFactory, ModuleLoadCause> {
        match self.modules.get(module_name) {
            Some(factory) => {
                let factory = Arc::clone(factory);
                Ok(Box::new(move || factory()))
            }
            None => Err(format!("Module '{module_name}' is not exposed by this entry module").into()),
        }
    }
}
