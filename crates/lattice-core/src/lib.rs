pub mod config;
pub mod event;
pub mod kernel;
pub mod plugin_system;

// Re-export key public types/traits for easier use by the binary and embedders
pub use config::RegistryConfig;
pub use event::{PluginEventType, SharedEventDispatcher, Subscription};
pub use kernel::Application;
pub use kernel::error::Error as KernelError;
pub use plugin_system::{
    CodeRef, LoadedExtension, PluginEntryModule, PluginLoader, PluginManifest, PluginRegistry,
    PropertyValue,
};
