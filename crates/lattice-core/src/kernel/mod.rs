//! # Lattice Core Kernel
//!
//! The `kernel` module ties the subsystems together.
//!
//! - **Composition root**: [`Application`](bootstrap::Application) builds the
//!   plugin registry from a [`RegistryConfig`](crate::config::RegistryConfig)
//!   and hands it out as a plain injectable dependency.
//! - **Component Lifecycle**: the [`KernelComponent`](component::KernelComponent)
//!   trait and the [`DependencyRegistry`](component::DependencyRegistry) that
//!   stores components by concrete type.
//! - **Core Constants**: system-wide constants in `constants`.
//! - **Error Handling**: the top-level [`Error`](error::Error) and `Result`.
pub mod bootstrap;
pub mod component;
pub mod constants;
pub mod error;

pub use bootstrap::Application;
pub use component::{DependencyRegistry, KernelComponent};
pub use error::{Error, Result};
// Test module declaration
#[cfg(test)]
mod tests;
