//! Adapter seam between the core and vendor APIs
//!
//! An [`Adapter`] translates a [`GenericRequest`] into one vendor call and the
//! vendor response back into a [`GenericResult`]. The core never sees vendor
//! payload details; it only observes success, failure, and latency.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::core::types::{GenericRequest, GenericResult, ServiceType};

/// Error returned by an adapter invocation
///
/// Transient and permanent failures both trigger failover to the next
/// candidate; the distinction is carried for future backoff and
/// circuit-breaking policy.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Retryable failure (network hiccup, vendor overload)
    #[error("transient failure: {message}")]
    Transient {
        /// Failure detail
        message: String,
    },

    /// Non-retryable failure against this vendor; still safe to fail over,
    /// since a different provider may interpret the generic request
    /// differently
    #[error("permanent failure: {message}")]
    Permanent {
        /// Failure detail
        message: String,
    },

    /// HTTP transport error
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status from the vendor
    #[error("upstream returned status {code}: {message}")]
    Status {
        /// HTTP status code
        code: u16,
        /// Response body or reason phrase
        message: String,
    },
}

impl AdapterError {
    /// Build a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Build a permanent error
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    /// Whether trying another provider could plausibly succeed sooner
    pub fn is_transient(&self) -> bool {
        match self {
            AdapterError::Transient { .. } | AdapterError::Http(_) => true,
            AdapterError::Permanent { .. } => false,
            AdapterError::Status { code, .. } => {
                matches!(code, 408 | 429) || *code >= 500
            }
        }
    }
}

/// Translation layer between the generic request/result and one vendor
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Perform one vendor call
    ///
    /// Implementations apply their own vendor timeout and must not retry
    /// internally; failover across providers is the dispatcher's job.
    async fn invoke(
        &self,
        service_type: ServiceType,
        request: &GenericRequest,
    ) -> Result<GenericResult, AdapterError>;
}

/// Registry of adapters keyed by `(provider name, service type)`
#[derive(Default)]
pub struct AdapterRegistry {
    inner: DashMap<(String, ServiceType), Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Create an empty adapter registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter for one provider/service-type pair
    ///
    /// Replaces any previous registration for the same pair.
    pub fn register(
        &self,
        provider: impl Into<String>,
        service_type: ServiceType,
        adapter: Arc<dyn Adapter>,
    ) {
        let provider = provider.into();
        debug!(provider = %provider, service_type = %service_type, "adapter registered");
        self.inner.insert((provider, service_type), adapter);
    }

    /// Look up the adapter for a provider/service-type pair
    pub fn get(&self, provider: &str, service_type: ServiceType) -> Option<Arc<dyn Adapter>> {
        self.inner
            .get(&(provider.to_string(), service_type))
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Number of registered adapters
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether no adapters are registered
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
