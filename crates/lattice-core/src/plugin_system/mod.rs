//! # Lattice Core Plugin System
//!
//! Tracks which plugins are registered, which of their extensions are in use,
//! and resolves the plugin-owned code those extensions point at.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`manifest`]**: the serialized plugin description ([`PluginManifest`])
//!   and its extension declarations.
//! - **[`properties`]**: extension property trees ([`PropertyValue`]) and the
//!   depth-first visitor used by the codec and the resolver.
//! - **[`coderef`]**: decodes `{"$codeRef": "module.export"}` leaves into
//!   lazily loadable [`CodeRef`] thunks.
//! - **[`resolver`]**: invokes every code reference of an extension and
//!   collects all failures before reporting.
//! - **[`filter`]**: feature-flag gating of extensions.
//! - **[`entry_module`]**: the handle through which a plugin's modules are
//!   fetched ([`PluginEntryModule`]).
//! - **[`loader`]**: the loader contract ([`PluginLoader`]) and an
//!   in-process [`StaticPluginLoader`].
//! - **[`registry`]**: the [`PluginRegistry`] that owns plugin state and
//!   announces changes through the event system.
//! - **[`error`]**: [`PluginSystemError`] and [`CodeRefError`].
pub mod coderef;
pub mod entry_module;
pub mod error;
pub mod extension;
pub mod filter;
pub mod loader;
pub mod manifest;
pub mod properties;
pub mod registry;
pub mod resolver;

pub use coderef::{CodeRef, decode_code_refs, parse_code_ref};
pub use entry_module::{ExportValue, PluginEntryModule, PluginModule, StaticEntryModule};
pub use error::{CodeRefError, PluginSystemError};
pub use extension::LoadedExtension;
pub use filter::{FeatureFlags, is_extension_in_use};
pub use loader::{ManifestSource, PluginBundle, PluginLoadResult, PluginLoader, StaticPluginLoader};
pub use manifest::{ExtensionDescriptor, ExtensionFlags, PluginManifest, PluginMetadata};
pub use properties::{EncodedCodeRef, PropertyMap, PropertyValue};
pub use registry::{PluginInfoEntry, PluginRegistry, PluginRegistryOptions, PluginStatus, RegistrySnapshot};
pub use resolver::{resolve_code_ref_values, resolve_extensions};

// Test module declaration
#[cfg(test)]
mod tests;
