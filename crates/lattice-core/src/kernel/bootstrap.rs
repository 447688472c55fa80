use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::RegistryConfig;
use crate::kernel::component::{DependencyRegistry, KernelComponent};
use crate::kernel::constants;
use crate::kernel::error::{Error, KernelLifecyclePhase, Result};
use crate::plugin_system::loader::PluginLoader;
use crate::plugin_system::registry::{PluginRegistry, PluginRegistryOptions};

/// Composition root: builds the plugin registry from configuration and runs
/// the lifecycle of every registered component.
pub struct Application {
    started: bool,
    dependencies: Arc<Mutex<DependencyRegistry>>,
    plugin_registry: Arc<PluginRegistry>,
}

impl Application {
    /// Create an application whose registry follows `config`.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        Self::with_options(config.to_options(), &config)
    }

    /// Like [`new`](Self::new), with registry options the configuration cannot
    /// express (such as a post-processing hook).
    pub fn with_options(options: PluginRegistryOptions, config: &RegistryConfig) -> Result<Self> {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);

        let plugin_registry = Arc::new(PluginRegistry::new(options));
        let initial_flags = config.initial_flags();
        if !initial_flags.is_empty() {
            log::debug!("Applying {} initial feature flag(s)", initial_flags.len());
            plugin_registry.set_feature_flags(initial_flags);
        }

        let mut registry = DependencyRegistry::new();
        registry.register_instance(Arc::clone(&plugin_registry));

        Ok(Application {
            started: false,
            dependencies: Arc::new(Mutex::new(registry)),
            plugin_registry,
        })
    }

    /// The registry shared by everything this application hosts
    pub fn plugin_registry(&self) -> Arc<PluginRegistry> {
        Arc::clone(&self.plugin_registry)
    }

    /// Gets a specific component instance by its concrete type T.
    pub async fn get_component<T: KernelComponent + 'static>(&self) -> Option<Arc<T>> {
        let registry = self.dependencies.lock().await;
        registry.get_concrete::<T>()
    }

    /// Register an additional component; it joins the lifecycle after the registry.
    pub async fn register_component<V: KernelComponent + 'static>(&self, component: Arc<V>) -> Result<()> {
        if self.started {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Bootstrap,
                component_name: Some(component.name().to_string()),
                message: "Components must be registered before start".to_string(),
                source: None,
            });
        }
        self.dependencies.lock().await.register_instance(component);
        Ok(())
    }

    /// Connect the registry to `loader`.
    pub fn attach_loader(&self, loader: Arc<dyn PluginLoader>) -> Result<()> {
        self.plugin_registry.set_loader(loader)?;
        log::debug!("Plugin loader attached");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Initialize, then start, every component in registration order.
    pub async fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(Error::KernelLifecycleError {
                phase: KernelLifecyclePhase::Start,
                component_name: None,
                message: "Application already started".to_string(),
                source: None,
            });
        }

        let components = self.dependencies.lock().await.components_in_order();
        for component in &components {
            log::debug!("Initializing component: {}", component.name());
            component
                .initialize()
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Initialize, component.name(), e))?;
        }
        for component in &components {
            log::debug!("Starting component: {}", component.name());
            component
                .start()
                .await
                .map_err(|e| Error::lifecycle(KernelLifecyclePhase::Start, component.name(), e))?;
        }

        self.started = true;
        log::info!("{} started with {} component(s)", constants::APP_NAME, components.len());
        Ok(())
    }

    /// Stop every component in reverse registration order.
    ///
    /// All components are stopped even if one fails; the first failure is returned.
    pub async fn shutdown(&mut self) -> Result<()> {
        let components = self.dependencies.lock().await.components_in_order();
        let mut first_error = None;
        for component in components.iter().rev() {
            log::debug!("Stopping component: {}", component.name());
            if let Err(e) = component.stop().await {
                log::error!("Error stopping component {}: {}", component.name(), e);
                first_error.get_or_insert(Error::lifecycle(KernelLifecyclePhase::Shutdown, component.name(), e));
            }
        }

        self.started = false;
        match first_error {
            Some(e) => Err(e),
            None => {
                log::info!("{} shut down", constants::APP_NAME);
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("started", &self.started)
            .field("plugin_registry", &self.plugin_registry)
            .finish_non_exhaustive()
    }
}
