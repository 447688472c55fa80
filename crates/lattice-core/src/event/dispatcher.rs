use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::event::{EventId, EventListener, PluginEventType};

//--------------------------------------------------
// EventDispatcher (Internal, wrapped by SharedEventDispatcher)
//--------------------------------------------------

/// Listener storage keyed by event type
pub struct EventDispatcher {
    handlers: HashMap<PluginEventType, Vec<(EventId, EventListener)>>,
    next_handler_id: EventId,
}

// Manual Debug implementation for EventDispatcher
impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handler_count: usize = self.handlers.values().map(|v| v.len()).sum();
        f.debug_struct("EventDispatcher")
            .field("handlers_count", &handler_count)
            .field("next_handler_id", &self.next_handler_id)
            .finish()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            next_handler_id: 1,
        }
    }

    /// Register one listener under every given event type; all entries share the returned id.
    pub fn register_handler(&mut self, event_types: &[PluginEventType], listener: EventListener) -> EventId {
        let id = self.next_handler_id;
        self.next_handler_id += 1;
        for event_type in event_types {
            let entries = self.handlers.entry(*event_type).or_default();
            // Subscribing twice to the same type through one call registers once
            if !entries.iter().any(|(h_id, _)| *h_id == id) {
                entries.push((id, Arc::clone(&listener)));
            }
        }
        id
    }

    pub fn unregister_handler(&mut self, id: EventId) -> bool {
        let mut found = false;
        self.handlers.values_mut().for_each(|handlers| {
            let len_before = handlers.len();
            handlers.retain(|(h_id, _)| *h_id != id);
            if handlers.len() < len_before {
                found = true;
            }
        });
        found
    }

    /// Snapshot of the listeners currently subscribed to `event_type`.
    pub fn handlers_for(&self, event_type: PluginEventType) -> Vec<EventListener> {
        self.handlers
            .get(&event_type)
            .map(|handlers| handlers.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    pub fn handler_count(&self, event_type: PluginEventType) -> usize {
        self.handlers.get(&event_type).map_or(0, Vec::len)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

//--------------------------------------------------
// SharedEventDispatcher (Public API)
//--------------------------------------------------

/// Thread-safe shared event dispatcher
#[derive(Clone)]
pub struct SharedEventDispatcher {
    dispatcher: Arc<Mutex<EventDispatcher>>,
}

impl fmt::Debug for SharedEventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedEventDispatcher").finish_non_exhaustive()
    }
}

impl SharedEventDispatcher {
    pub fn new() -> Self {
        Self {
            dispatcher: Arc::new(Mutex::new(EventDispatcher::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EventDispatcher> {
        self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe `listener` to the given event types.
    ///
    /// An empty `event_types` slice is a no-op: a warning is logged and an
    /// inert [`Subscription`] is returned.
    pub fn subscribe<F>(&self, event_types: &[PluginEventType], listener: F) -> Subscription
    where
        F: Fn(PluginEventType) + Send + Sync + 'static,
    {
        if event_types.is_empty() {
            log::warn!("subscribe called with empty event types");
            return Subscription::inert();
        }
        let id = self.lock().register_handler(event_types, Arc::new(listener));
        Subscription {
            id,
            dispatcher: Arc::downgrade(&self.dispatcher),
            active: AtomicBool::new(true),
        }
    }

    /// Invoke every listener subscribed to `event_type`, returning how many ran.
    ///
    /// Listeners run outside the dispatcher lock, so they may subscribe or
    /// unsubscribe while being notified.
    pub fn dispatch(&self, event_type: PluginEventType) -> usize {
        let listeners = self.lock().handlers_for(event_type);
        for listener in &listeners {
            listener(event_type);
        }
        listeners.len()
    }

    pub fn unregister_handler(&self, id: EventId) -> bool {
        self.lock().unregister_handler(id)
    }

    pub fn handler_count(&self, event_type: PluginEventType) -> usize {
        self.lock().handler_count(event_type)
    }
}

impl Default for SharedEventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle returned by [`SharedEventDispatcher::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it. Unsubscribing more than once
/// is harmless.
#[derive(Debug)]
pub struct Subscription {
    id: EventId,
    dispatcher: Weak<Mutex<EventDispatcher>>,
    active: AtomicBool,
}

impl Subscription {
    fn inert() -> Self {
        Self {
            id: 0,
            dispatcher: Weak::new(),
            active: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Remove the listener. Returns `true` only for the call that removed it.
    pub fn unsubscribe(&self) -> bool {
        if !self.active.swap(false, Ordering::SeqCst) {
            return false;
        }
        match self.dispatcher.upgrade() {
            Some(dispatcher) => dispatcher
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .unregister_handler(self.id),
            None => false,
        }
    }
}

//--------------------------------------------------
// Helper Functions
//--------------------------------------------------

/// Create a new event dispatcher instance
pub fn create_dispatcher() -> SharedEventDispatcher {
    SharedEventDispatcher::new()
}
