//! Plugin loader contract.
//!
//! A loader fetches plugin bundles and reports one [`PluginLoadResult`] per
//! load attempt to its subscribed listener. The registry attaches to at most
//! one loader at a time (see
//! [`PluginRegistry::set_loader`](crate::plugin_system::PluginRegistry::set_loader)).
//!
//! [`StaticPluginLoader`] is an in-process implementation serving bundles
//! registered up front; it is what the CLI and the tests use.
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::plugin_system::entry_module::PluginEntryModule;
use crate::plugin_system::manifest::PluginManifest;

/// Opaque cause attached to a failed load
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync>;

/// Outcome of one load attempt
#[derive(Clone)]
pub enum PluginLoadResult {
    Success {
        plugin_name: String,
        manifest: PluginManifest,
        entry_module: Arc<dyn PluginEntryModule>,
    },
    Failure {
        plugin_name: Option<String>,
        error_message: String,
        error_cause: Option<ErrorCause>,
    },
}

impl fmt::Debug for PluginLoadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginLoadResult::Success { plugin_name, .. } => f
                .debug_struct("Success")
                .field("plugin_name", plugin_name)
                .finish_non_exhaustive(),
            PluginLoadResult::Failure {
                plugin_name,
                error_message,
                error_cause,
            } => f
                .debug_struct("Failure")
                .field("plugin_name", plugin_name)
                .field("error_message", error_message)
                .field("error_cause", error_cause)
                .finish(),
        }
    }
}

/// Which manifest to load from a base URL
#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// Manifest file name relative to the base URL
    Name(String),
    /// Manifest already at hand
    Inline(PluginManifest),
}

pub type LoadResultListener = Arc<dyn Fn(PluginLoadResult) + Send + Sync>;

/// Handle returned by [`PluginLoader::subscribe`]
pub struct LoaderSubscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl LoaderSubscription {
    pub fn new<F>(unsubscribe: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl fmt::Debug for LoaderSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderSubscription").finish_non_exhaustive()
    }
}

#[async_trait]
pub trait PluginLoader: Send + Sync {
    /// Register the listener that receives every load outcome.
    fn subscribe(&self, listener: LoadResultListener) -> LoaderSubscription;

    /// Start loading the plugin at `base_url`. Completes once the outcome has
    /// been delivered to the listener; the outcome itself is never returned.
    async fn load_plugin(&self, base_url: &str, manifest: Option<ManifestSource>);
}

/// A plugin bundle the static loader can serve
#[derive(Clone)]
pub struct PluginBundle {
    pub manifest: PluginManifest,
    pub entry_module: Arc<dyn PluginEntryModule>,
}

#[derive(Clone)]
enum BundleEntry {
    Ready(PluginBundle),
    Broken {
        plugin_name: Option<String>,
        error_message: String,
    },
}

#[derive(Default)]
struct StaticLoaderState {
    bundles: HashMap<String, BundleEntry>,
    listeners: Vec<(u64, LoadResultListener)>,
    next_listener_id: u64,
}

/// Loader serving bundles registered in-process, keyed by base URL
#[derive(Clone, Default)]
pub struct StaticPluginLoader {
    state: Arc<Mutex<StaticLoaderState>>,
}

impl StaticPluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StaticLoaderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Serve `bundle` for loads of `base_url`, replacing any previous entry.
    pub fn register_bundle(&self, base_url: impl Into<String>, bundle: PluginBundle) {
        self.lock().bundles.insert(base_url.into(), BundleEntry::Ready(bundle));
    }

    /// Make loads of `base_url` fail with `error_message`.
    pub fn register_failure(
        &self,
        base_url: impl Into<String>,
        plugin_name: Option<String>,
        error_message: impl Into<String>,
    ) {
        self.lock().bundles.insert(
            base_url.into(),
            BundleEntry::Broken {
                plugin_name,
                error_message: error_message.into(),
            },
        );
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    fn outcome_for(&self, base_url: &str, manifest: Option<ManifestSource>) -> PluginLoadResult {
        let entry = self.lock().bundles.get(base_url).cloned();
        match (entry, manifest) {
            (Some(BundleEntry::Ready(bundle)), Some(ManifestSource::Inline(manifest))) => {
                PluginLoadResult::Success {
                    plugin_name: manifest.name.clone(),
                    manifest,
                    entry_module: bundle.entry_module,
                }
            }
            (Some(BundleEntry::Ready(bundle)), _) => PluginLoadResult::Success {
                plugin_name: bundle.manifest.name.clone(),
                manifest: bundle.manifest,
                entry_module: bundle.entry_module,
            },
            (Some(BundleEntry::Broken { plugin_name, error_message }), _) => PluginLoadResult::Failure {
                plugin_name,
                error_message,
                error_cause: None,
            },
            (None, manifest) => PluginLoadResult::Failure {
                plugin_name: match manifest {
                    Some(ManifestSource::Inline(manifest)) => Some(manifest.name),
                    _ => None,
                },
                error_message: format!("No plugin bundle available at {base_url}"),
                error_cause: None,
            },
        }
    }
}

impl fmt::Debug for StaticPluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("StaticPluginLoader")
            .field("bundles", &state.bundles.len())
            .field("listeners", &state.listeners.len())
            .finish()
    }
}

#[async_trait]
impl PluginLoader for StaticPluginLoader {
    fn subscribe(&self, listener: LoadResultListener) -> LoaderSubscription {
        let id = {
            let mut state = self.lock();
            state.next_listener_id += 1;
            let id = state.next_listener_id;
            state.listeners.push((id, listener));
            id
        };
        let state = Arc::downgrade(&self.state);
        LoaderSubscription::new(move || {
            if let Some(state) = state.upgrade() {
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .retain(|(l_id, _)| *l_id != id);
            }
        })
    }

    async fn load_plugin(&self, base_url: &str, manifest: Option<ManifestSource>) {
        // Completion is asynchronous, as with a network fetch
        tokio::task::yield_now().await;

        let outcome = self.outcome_for(base_url, manifest);
        let listeners: Vec<LoadResultListener> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(outcome.clone());
        }
    }
}
