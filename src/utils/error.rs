//! Error types for the gateway

use thiserror::Error;

use crate::core::adapter::AdapterError;
use crate::core::types::ServiceType;

/// Result type alias for the gateway
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Main error type for the gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown load-balancing strategy selector, surfaced at setup time
    #[error("unknown load-balancing strategy: {0}")]
    UnknownStrategy(String),

    /// Provider descriptor violating a registration invariant
    #[error("invalid provider {name}: {reason}")]
    InvalidProvider {
        /// Offending provider name
        name: String,
        /// What the descriptor violated
        reason: String,
    },

    /// The active provider set is empty
    #[error("no providers registered")]
    NoProviders,

    /// Capability filtering or exclusion produced an empty candidate set
    #[error("no eligible provider for service type {0}")]
    NoEligible(ServiceType),

    /// Every attempted provider failed within one dispatch
    #[error("all providers failed for {service_type} after {} attempt(s)", attempts.len())]
    AllProvidersFailed {
        /// Service type of the failed request
        service_type: ServiceType,
        /// One entry per attempted provider, in attempt order
        attempts: Vec<(String, AdapterError)>,
    },

    /// The per-request deadline expired before a provider succeeded
    #[error("request deadline exceeded")]
    DeadlineExceeded,

    /// IO errors (config loading, audio output)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GatewayError {
    /// Per-provider failures carried by an `AllProvidersFailed` error
    pub fn provider_failures(&self) -> &[(String, AdapterError)] {
        match self {
            GatewayError::AllProvidersFailed { attempts, .. } => attempts,
            _ => &[],
        }
    }
}
