//! # Lattice Core Event System
//!
//! Typed publish/subscribe used by the plugin registry to announce state
//! changes. Listeners subscribe to one or more [`PluginEventType`]s and are
//! invoked synchronously, in registration order, every time an event of a
//! subscribed type is dispatched.
//!
//! - **[`types`]**: the closed set of registry events.
//! - **[`dispatcher`]**: handler storage ([`EventDispatcher`]) and its
//!   thread-safe, cloneable wrapper ([`SharedEventDispatcher`]).
pub mod dispatcher;
pub mod types;

use std::sync::Arc;

/// Type for listener identifiers
pub type EventId = u64;

/// Listener invoked with the type of the event being dispatched
pub type EventListener = Arc<dyn Fn(PluginEventType) + Send + Sync>;

/// Re-export important types
pub use dispatcher::{EventDispatcher, SharedEventDispatcher, Subscription, create_dispatcher};
pub use types::PluginEventType;

// Test module declaration
#[cfg(test)]
mod tests;
