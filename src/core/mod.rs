//! Core gateway components
//!
//! Provider registry, statistics tracking, candidate ranking, and
//! dispatch-with-failover. The core calls out to an [`adapter::Adapter`] per
//! provider and never sees vendor payload details itself.

pub mod adapter;
pub mod balancer;
pub mod dispatcher;
pub mod registry;
pub mod stats;
pub mod types;

pub use adapter::{Adapter, AdapterError, AdapterRegistry};
pub use balancer::{LoadBalancer, Strategy};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use registry::ProviderRegistry;
pub use stats::{ProviderStats, StatsTracker};
pub use types::{
    Credential, GenericRequest, GenericResult, Outcome, Provider, ServiceType,
    WILDCARD_CAPABILITY,
};
