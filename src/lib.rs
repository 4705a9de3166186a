//! gengate - a generation gateway over heterogeneous AI providers
//!
//! One facade, [`Gateway`], fronts a fleet of vendor APIs for text, image,
//! and speech generation. Callers submit a [`GenericRequest`] for a
//! [`ServiceType`]; the gateway ranks eligible providers under the configured
//! load-balancing strategy, invokes the chosen provider's [`Adapter`], and
//! fails over to the next candidate on error until one succeeds or the fleet
//! is exhausted. Per-provider telemetry feeds back into ranking.
//!
//! ```no_run
//! use gengate::{Gateway, GatewayConfig, GenericRequest, ServiceType};
//!
//! #[tokio::main]
//! async fn main() -> gengate::Result<()> {
//!     let config = GatewayConfig::from_file("gateway.yaml").await?;
//!     let gateway = Gateway::new(&config)?;
//!
//!     let request = GenericRequest {
//!         model: "gpt-4o".to_string(),
//!         prompt: "Summarize the plot of Hamlet".to_string(),
//!         ..Default::default()
//!     };
//!     let result = gateway.execute(ServiceType::Text, &request).await?;
//!     println!("{}", result.content.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod config;
pub mod core;
pub mod utils;

use std::collections::HashMap;
use std::sync::Arc;

pub use adapters::{OpenAiCompatAdapter, SpeechAdapter};
pub use config::{GatewayConfig, ProviderConfig};
pub use core::adapter::{Adapter, AdapterError, AdapterRegistry};
pub use core::balancer::{LoadBalancer, Strategy};
pub use core::dispatcher::{Dispatcher, DispatcherConfig};
pub use core::registry::ProviderRegistry;
pub use core::stats::{ProviderStats, StatsTracker};
pub use core::types::{
    Credential, GenericRequest, GenericResult, Outcome, Provider, ServiceType,
};
pub use utils::error::{GatewayError, Result};

/// The assembled gateway
///
/// Owns the registry, stats tracker, balancer, and dispatcher, wired
/// together from one [`GatewayConfig`]. Cheap to share behind an `Arc`;
/// every method takes `&self`.
pub struct Gateway {
    registry: Arc<ProviderRegistry>,
    stats: Arc<StatsTracker>,
    adapters: Arc<AdapterRegistry>,
    dispatcher: Dispatcher,
}

impl Gateway {
    /// Build a gateway from configuration
    ///
    /// Validates the strategy selector and provider set eagerly; a bad
    /// config fails here, not on the first request. Adapters start empty
    /// and are attached with [`Gateway::register_adapter`].
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let stats = Arc::new(StatsTracker::new());
        let registry = Arc::new(ProviderRegistry::new(stats.clone()));
        registry.register(config.providers())?;

        let balancer = Arc::new(LoadBalancer::new(
            registry.clone(),
            stats.clone(),
            config.strategy()?,
        ));
        let adapters = Arc::new(AdapterRegistry::new());
        let dispatcher = Dispatcher::new(
            balancer,
            stats.clone(),
            adapters.clone(),
            config.dispatcher_config(),
        );

        Ok(Self {
            registry,
            stats,
            adapters,
            dispatcher,
        })
    }

    /// Attach an adapter for one provider/service pair
    pub fn register_adapter(
        &self,
        provider: impl Into<String>,
        service_type: ServiceType,
        adapter: Arc<dyn Adapter>,
    ) {
        self.adapters.register(provider, service_type, adapter);
    }

    /// Execute a request, failing over across providers as needed
    pub async fn execute(
        &self,
        service_type: ServiceType,
        request: &GenericRequest,
    ) -> Result<GenericResult> {
        self.dispatcher.execute(service_type, request).await
    }

    /// Replace the provider fleet from a freshly loaded config
    ///
    /// Full-replace semantics: the new provider list supersedes the old one
    /// atomically. Stats for providers that survive the reload are retained.
    /// Strategy and dispatcher settings are fixed at construction.
    pub fn reload(&self, config: &GatewayConfig) -> Result<()> {
        self.registry.register(config.providers())
    }

    /// Active provider set, in registration order
    pub fn providers(&self) -> Vec<Provider> {
        self.registry.providers()
    }

    /// Point-in-time snapshot of per-provider telemetry
    pub fn stats(&self) -> HashMap<String, ProviderStats> {
        self.stats.snapshot()
    }
}
