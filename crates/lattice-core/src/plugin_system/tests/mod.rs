use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::event::{PluginEventType, Subscription};
use crate::plugin_system::entry_module::{ModuleFactory, ModuleLoadCause, PluginEntryModule, PluginModule};
use crate::plugin_system::registry::PluginRegistry;

mod manifest_tests;

/// Entry module whose `get` counts calls and fails for unknown modules
#[derive(Default)]
struct CountingEntryModule {
    modules: Vec<(String, PluginModule)>,
    calls: AtomicUsize,
}

impl CountingEntryModule {
    fn with_module(mut self, name: &str, module: PluginModule) -> Self {
        self.modules.push((name.to_string(), module));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginEntryModule for CountingEntryModule {
    async fn get(&self, module_name: &str) -> Result<ModuleFactory, ModuleLoadCause> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.modules.iter().find(|(name, _)| name == module_name) {
            Some((_, module)) => {
                let module = module.clone();
                Ok(Box::new(move || module))
            }
            None => Err(format!("network error fetching {module_name}").into()),
        }
    }
}

/// Records every event the registry emits, in order
fn record_events(registry: &PluginRegistry) -> (Arc<Mutex<Vec<PluginEventType>>>, Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let subscription = registry.subscribe(&PluginEventType::ALL, move |event| {
        sink.lock().unwrap().push(event);
    });
    (events, subscription)
}

fn take_events(events: &Arc<Mutex<Vec<PluginEventType>>>) -> Vec<PluginEventType> {
    std::mem::take(&mut *events.lock().unwrap())
}
