use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;
use uuid::Uuid;

use crate::event::{PluginEventType, SharedEventDispatcher, Subscription};
use crate::kernel::component::KernelComponent;
use crate::kernel::error::Result as KernelResult;
use crate::plugin_system::coderef::{decode_code_refs, get_plugin_module};
use crate::plugin_system::entry_module::{PluginEntryModule, PluginModule};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::extension::LoadedExtension;
use crate::plugin_system::filter::{self, FeatureFlags};
use crate::plugin_system::loader::{ErrorCause, ManifestSource, PluginLoadResult, PluginLoader, LoaderSubscription};
use crate::plugin_system::manifest::{ExtensionDescriptor, PluginManifest, PluginMetadata};

/// Hook applied to a plugin's extensions after code references are decoded
pub type PostProcessExtensions = Arc<dyn Fn(Vec<LoadedExtension>) -> Vec<LoadedExtension> + Send + Sync>;

/// Behaviour switches for [`PluginRegistry`]
#[derive(Clone)]
pub struct PluginRegistryOptions {
    /// Enable plugins as soon as the attached loader reports them loaded
    pub auto_enable_loaded_plugins: bool,
    /// Post-process each plugin's extensions before they are stored
    pub post_process_extensions: Option<PostProcessExtensions>,
}

impl Default for PluginRegistryOptions {
    fn default() -> Self {
        Self {
            auto_enable_loaded_plugins: true,
            post_process_extensions: None,
        }
    }
}

impl fmt::Debug for PluginRegistryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistryOptions")
            .field("auto_enable_loaded_plugins", &self.auto_enable_loaded_plugins)
            .field("post_process_extensions", &self.post_process_extensions.is_some())
            .finish()
    }
}

/// Load status reported by [`PluginInfoEntry::status`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Loaded,
    Failed,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginStatus::Loaded => f.write_str("loaded"),
            PluginStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Public view of one known plugin
#[derive(Debug, Clone)]
pub enum PluginInfoEntry {
    Loaded {
        plugin_name: String,
        metadata: Arc<PluginMetadata>,
        enabled: bool,
        disable_reason: Option<String>,
    },
    Failed {
        plugin_name: String,
        error_message: String,
        error_cause: Option<ErrorCause>,
    },
}

impl PluginInfoEntry {
    pub fn plugin_name(&self) -> &str {
        match self {
            PluginInfoEntry::Loaded { plugin_name, .. } | PluginInfoEntry::Failed { plugin_name, .. } => {
                plugin_name
            }
        }
    }

    pub fn status(&self) -> PluginStatus {
        match self {
            PluginInfoEntry::Loaded { .. } => PluginStatus::Loaded,
            PluginInfoEntry::Failed { .. } => PluginStatus::Failed,
        }
    }
}

/// Immutable view of registry state published at the end of every transaction
#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub extensions: Arc<[Arc<LoadedExtension>]>,
    pub plugin_info: Arc<[PluginInfoEntry]>,
    pub feature_flags: FeatureFlags,
}

impl RegistrySnapshot {
    fn empty() -> Self {
        Self {
            extensions: Arc::from(Vec::new()),
            plugin_info: Arc::from(Vec::new()),
            feature_flags: FeatureFlags::new(),
        }
    }
}

struct LoadedPlugin {
    metadata: Arc<PluginMetadata>,
    extensions: Arc<[Arc<LoadedExtension>]>,
    entry_module: Arc<dyn PluginEntryModule>,
    enabled: bool,
    disable_reason: Option<String>,
}

struct FailedPlugin {
    error_message: String,
    error_cause: Option<ErrorCause>,
}

struct RegistryState {
    /// Plugins that were successfully loaded and processed
    loaded: IndexMap<String, LoadedPlugin>,
    /// Plugins that failed to load
    failed: IndexMap<String, FailedPlugin>,
    feature_flags: FeatureFlags,
    /// Extensions currently in use
    extensions: Arc<[Arc<LoadedExtension>]>,
}

impl RegistryState {
    fn is_known(&self, plugin_name: &str) -> bool {
        self.loaded.contains_key(plugin_name) || self.failed.contains_key(plugin_name)
    }

    /// Rebuild the in-use list from scratch; returns whether it changed.
    fn update_extensions(&mut self) -> bool {
        let next = filter::active_extensions(
            self.loaded.values().map(|p| (p.enabled, &p.extensions[..])),
            &self.feature_flags,
        );
        let changed = next.len() != self.extensions.len()
            || next
                .iter()
                .zip(self.extensions.iter())
                .any(|(a, b)| !Arc::ptr_eq(a, b));
        if changed {
            log::debug!("Extensions in use: {} -> {}", self.extensions.len(), next.len());
            self.extensions = next.into();
        }
        changed
    }

    fn snapshot(&self) -> RegistrySnapshot {
        let loaded = self.loaded.iter().map(|(name, plugin)| PluginInfoEntry::Loaded {
            plugin_name: name.clone(),
            metadata: Arc::clone(&plugin.metadata),
            enabled: plugin.enabled,
            disable_reason: plugin.disable_reason.clone(),
        });
        let failed = self.failed.iter().map(|(name, plugin)| PluginInfoEntry::Failed {
            plugin_name: name.clone(),
            error_message: plugin.error_message.clone(),
            error_cause: plugin.error_cause.clone(),
        });
        RegistrySnapshot {
            extensions: Arc::clone(&self.extensions),
            plugin_info: loaded.chain(failed).collect::<Vec<_>>().into(),
            feature_flags: self.feature_flags.clone(),
        }
    }
}

struct LoaderConnection {
    loader: Arc<dyn PluginLoader>,
    subscription: LoaderSubscription,
}

/// Manages plugins and their extensions.
///
/// Mutating operations run as serialized transactions over the plugin maps,
/// the feature flags and the cached in-use extension list. Each transaction
/// publishes a fresh [`RegistrySnapshot`] before it releases the lock, and its
/// events are dispatched afterwards, so listeners may call back into the
/// registry. Readers only ever clone the published snapshot.
pub struct PluginRegistry {
    options: PluginRegistryOptions,
    state: Mutex<RegistryState>,
    snapshot: RwLock<Arc<RegistrySnapshot>>,
    events: SharedEventDispatcher,
    loader: Mutex<Option<LoaderConnection>>,
}

impl PluginRegistry {
    pub fn new(options: PluginRegistryOptions) -> Self {
        Self {
            options,
            state: Mutex::new(RegistryState {
                loaded: IndexMap::new(),
                failed: IndexMap::new(),
                feature_flags: FeatureFlags::new(),
                extensions: Arc::from(Vec::new()),
            }),
            snapshot: RwLock::new(Arc::new(RegistrySnapshot::empty())),
            events: SharedEventDispatcher::new(),
            loader: Mutex::new(None),
        }
    }

    pub fn options(&self) -> &PluginRegistryOptions {
        &self.options
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_loader(&self) -> MutexGuard<'_, Option<LoaderConnection>> {
        self.loader.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` as one transaction, publish the resulting state, then dispatch
    /// the events it produced.
    fn commit<R>(&self, f: impl FnOnce(&mut RegistryState, &mut Vec<PluginEventType>) -> R) -> R {
        let mut events = Vec::new();
        let result = {
            let mut state = self.lock_state();
            let result = f(&mut state, &mut events);
            if !events.is_empty() {
                let snapshot = Arc::new(state.snapshot());
                *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
            }
            result
        };
        for event in events {
            self.events.dispatch(event);
        }
        result
    }

    //--------------------------------------------------
    // Events
    //--------------------------------------------------

    pub fn subscribe<F>(&self, event_types: &[PluginEventType], listener: F) -> Subscription
    where
        F: Fn(PluginEventType) + Send + Sync + 'static,
    {
        self.events.subscribe(event_types, listener)
    }

    //--------------------------------------------------
    // Reads
    //--------------------------------------------------

    /// Latest published state
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Extensions currently in use
    pub fn get_extensions(&self) -> Arc<[Arc<LoadedExtension>]> {
        Arc::clone(&self.snapshot().extensions)
    }

    /// One entry per known plugin: loaded plugins first, then failed ones
    pub fn get_plugin_info(&self) -> Arc<[PluginInfoEntry]> {
        Arc::clone(&self.snapshot().plugin_info)
    }

    pub fn get_feature_flags(&self) -> FeatureFlags {
        self.snapshot().feature_flags.clone()
    }

    //--------------------------------------------------
    // Transactions
    //--------------------------------------------------

    /// Add a successfully loaded plugin.
    ///
    /// The plugin is stored disabled; enable it to put its extensions into use.
    /// Registering a name that is already known replaces the previous entry.
    pub fn register_loaded(&self, manifest: PluginManifest, entry_module: Arc<dyn PluginEntryModule>) {
        let plugin_name = manifest.name.clone();
        let build_hash = manifest
            .build_hash
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let metadata = Arc::new(manifest.metadata());
        let extensions = self.process_extensions(&plugin_name, &build_hash, manifest.extensions, &entry_module);

        let reload = self.commit(|state, events| {
            let reload = state.is_known(&plugin_name);
            state.loaded.insert(
                plugin_name.clone(),
                LoadedPlugin {
                    metadata,
                    extensions,
                    entry_module,
                    enabled: false,
                    disable_reason: None,
                },
            );
            state.failed.shift_remove(&plugin_name);
            events.push(PluginEventType::PluginInfoChanged);

            if reload && state.update_extensions() {
                events.push(PluginEventType::ExtensionsChanged);
            }
            reload
        });

        log::info!(
            "Plugin {} has been {}",
            plugin_name,
            if reload { "reloaded" } else { "loaded" }
        );
    }

    /// Record a plugin that failed to load, evicting any loaded version.
    pub fn register_failed(&self, plugin_name: &str, error_message: &str, error_cause: Option<ErrorCause>) {
        let reload = self.commit(|state, events| {
            let reload = state.is_known(plugin_name);
            state.loaded.shift_remove(plugin_name);
            state.failed.insert(
                plugin_name.to_string(),
                FailedPlugin {
                    error_message: error_message.to_string(),
                    error_cause,
                },
            );
            events.push(PluginEventType::PluginInfoChanged);

            if reload && state.update_extensions() {
                events.push(PluginEventType::ExtensionsChanged);
            }
            reload
        });

        log::error!(
            "Plugin {} has failed to {}",
            plugin_name,
            if reload { "reload" } else { "load" }
        );
    }

    /// Enable or disable loaded plugins, returning how many changed state.
    ///
    /// Names that are not loaded are skipped with a warning. Enabling clears
    /// the disable reason; disabling records `reason`.
    pub fn set_enabled<I, S>(&self, plugin_names: I, enabled: bool, reason: Option<&str>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let action = if enabled { "enable" } else { "disable" };

        self.commit(|state, events| {
            let mut flipped = 0;
            for name in plugin_names {
                let name = name.as_ref();
                let Some(plugin) = state.loaded.get_mut(name) else {
                    log::warn!(
                        "{}",
                        PluginSystemError::PluginNotLoaded {
                            plugin_name: name.to_string(),
                            operation: action.to_string(),
                        }
                    );
                    continue;
                };
                if plugin.enabled != enabled {
                    plugin.enabled = enabled;
                    plugin.disable_reason = if enabled { None } else { reason.map(str::to_string) };
                    flipped += 1;
                    log::info!("Plugin {} will be {}d", name, action);
                }
            }

            if flipped > 0 {
                state.update_extensions();
                events.push(PluginEventType::PluginInfoChanged);
                events.push(PluginEventType::ExtensionsChanged);
            }
            flipped
        })
    }

    pub fn enable_plugins<I, S>(&self, plugin_names: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_enabled(plugin_names, true, None)
    }

    pub fn disable_plugins<I, S>(&self, plugin_names: I, disable_reason: Option<&str>) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_enabled(plugin_names, false, disable_reason)
    }

    /// Merge `patch` into the current flags. Returns whether any flag value changed.
    pub fn set_feature_flags(&self, patch: FeatureFlags) -> bool {
        self.commit(|state, events| {
            if !filter::merge_flags(&mut state.feature_flags, patch) {
                return false;
            }
            if state.update_extensions() {
                events.push(PluginEventType::ExtensionsChanged);
            }
            events.push(PluginEventType::FeatureFlagsChanged);
            true
        })
    }

    /// Like [`set_feature_flags`](Self::set_feature_flags), taking a JSON
    /// object whose non-boolean entries are ignored.
    pub fn set_feature_flags_from_json(&self, patch: &serde_json::Value) -> bool {
        self.set_feature_flags(filter::flags_from_json(patch))
    }

    fn process_extensions(
        &self,
        plugin_name: &str,
        build_hash: &str,
        descriptors: Vec<ExtensionDescriptor>,
        entry_module: &Arc<dyn PluginEntryModule>,
    ) -> Arc<[Arc<LoadedExtension>]> {
        let decoded: Vec<LoadedExtension> = descriptors
            .into_iter()
            .enumerate()
            .map(|(index, descriptor)| {
                let mut extension = LoadedExtension::from_descriptor(descriptor, plugin_name, index, build_hash);
                decode_code_refs(&mut extension, entry_module);
                extension
            })
            .collect();

        let processed = match &self.options.post_process_extensions {
            Some(post_process) => post_process(decoded),
            None => decoded,
        };
        processed.into_iter().map(Arc::new).collect()
    }

    //--------------------------------------------------
    // Modules
    //--------------------------------------------------

    /// Load a module exposed by a loaded plugin's entry module.
    pub async fn get_exposed_module(
        &self,
        plugin_name: &str,
        module_name: &str,
    ) -> Result<PluginModule, PluginSystemError> {
        let entry_module = self
            .lock_state()
            .loaded
            .get(plugin_name)
            .map(|plugin| Arc::clone(&plugin.entry_module));

        let Some(entry_module) = entry_module else {
            return Err(PluginSystemError::PluginNotLoaded {
                plugin_name: plugin_name.to_string(),
                operation: format!("get module '{module_name}' of"),
            });
        };

        let format_error = |message: &str| format!("{message} of plugin {plugin_name}");
        Ok(get_plugin_module(module_name, entry_module.as_ref(), &format_error).await?)
    }

    //--------------------------------------------------
    // Loader lifecycle
    //--------------------------------------------------

    /// Connect this registry to `loader`; load outcomes are applied as they arrive.
    ///
    /// Fails with [`PluginSystemError::LoaderAlreadySet`] if a loader is
    /// attached. Use [`detach_loader`](Self::detach_loader) to disconnect.
    pub fn set_loader(self: &Arc<Self>, loader: Arc<dyn PluginLoader>) -> Result<(), PluginSystemError> {
        let mut connection = self.lock_loader();
        if connection.is_some() {
            return Err(PluginSystemError::LoaderAlreadySet);
        }

        let registry = Arc::downgrade(self);
        let subscription = loader.subscribe(Arc::new(move |result: PluginLoadResult| {
            if let Some(registry) = registry.upgrade() {
                registry.handle_load_result(result);
            }
        }));

        *connection = Some(LoaderConnection { loader, subscription });
        Ok(())
    }

    /// Disconnect from the current loader. Returns `false` if none was attached.
    pub fn detach_loader(&self) -> bool {
        let connection = self.lock_loader().take();
        match connection {
            Some(connection) => {
                connection.subscription.unsubscribe();
                true
            }
            None => false,
        }
    }

    pub fn has_loader(&self) -> bool {
        self.lock_loader().is_some()
    }

    /// Ask the attached loader to load a plugin.
    ///
    /// The outcome is applied through the loader subscription, not returned.
    pub async fn load_plugin(&self, base_url: &str, manifest: Option<ManifestSource>) -> Result<(), PluginSystemError> {
        let loader = self
            .lock_loader()
            .as_ref()
            .map(|connection| Arc::clone(&connection.loader));

        let Some(loader) = loader else {
            let err = PluginSystemError::LoaderNotConnected {
                operation: "loading any plugins".to_string(),
            };
            log::error!("{err}");
            return Err(err);
        };

        loader.load_plugin(base_url, manifest).await;
        Ok(())
    }

    fn handle_load_result(&self, result: PluginLoadResult) {
        match result {
            PluginLoadResult::Failure {
                plugin_name,
                error_message,
                error_cause,
            } => {
                match &error_cause {
                    Some(cause) => log::error!("{error_message}: {cause}"),
                    None => log::error!("{error_message}"),
                }
                if let Some(plugin_name) = plugin_name {
                    self.register_failed(&plugin_name, &error_message, error_cause);
                }
            }
            PluginLoadResult::Success {
                plugin_name,
                manifest,
                entry_module,
            } => {
                self.register_loaded(manifest, entry_module);
                if self.options.auto_enable_loaded_plugins {
                    self.enable_plugins([plugin_name.as_str()]);
                }
            }
        }
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(PluginRegistryOptions::default())
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("PluginRegistry")
            .field("plugins", &snapshot.plugin_info.len())
            .field("extensions", &snapshot.extensions.len())
            .field("has_loader", &self.has_loader())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KernelComponent for PluginRegistry {
    fn name(&self) -> &'static str {
        "PluginRegistry"
    }

    async fn initialize(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn start(&self) -> KernelResult<()> {
        Ok(())
    }

    async fn stop(&self) -> KernelResult<()> {
        if self.detach_loader() {
            log::info!("Plugin loader detached");
        }
        Ok(())
    }
}
