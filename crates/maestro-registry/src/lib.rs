//! Agent registry and capability discovery.
//!
//! [`AgentRegistry`] owns every agent descriptor, its configuration and the
//! lazily-constructed instance. [`AgentDiscovery`] derives a capability index
//! from the registry and answers "which agents cover these requirements".

/// Capability index and requirement analysis.
pub mod discovery;
/// Agent registration and instance lifecycle.
pub mod registry;

pub use discovery::{AgentDiscovery, CapabilityIndex};
pub use registry::AgentRegistry;
