//! Gateway configuration loading
//!
//! The configuration surface is a list of provider descriptors plus a single
//! strategy selector string. Reload is a full-replace operation: the whole
//! file is re-read and handed to the registry as one atomic swap.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::core::balancer::Strategy;
use crate::core::dispatcher::DispatcherConfig;
use crate::core::types::{Credential, Provider};
use crate::utils::error::{GatewayError, Result};

/// One provider descriptor as it appears in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider name
    pub name: String,
    /// Base address of the vendor API
    pub endpoint: String,
    /// Credential reference (API key or token)
    #[serde(default)]
    pub credential: Credential,
    /// Service types this provider serves (`text`, `image`, `tts`, `all`)
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Lower value preferred when scores tie
    #[serde(default)]
    pub priority: i32,
    /// Relative selection share for weighted ranking
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Whether the provider is a selection candidate
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

fn default_strategy() -> String {
    Strategy::default().as_str().to_string()
}

impl From<ProviderConfig> for Provider {
    fn from(config: ProviderConfig) -> Self {
        Provider {
            name: config.name,
            endpoint: config.endpoint,
            credential: config.credential,
            capabilities: config.capabilities.into_iter().collect::<HashSet<_>>(),
            priority: config.priority,
            weight: config.weight,
            enabled: config.enabled,
        }
    }
}

/// Top-level gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Strategy selector: `round-robin`, `weighted`, or `least-cost`
    #[serde(default = "default_strategy")]
    pub strategy: String,
    /// Maximum distinct providers tried per request; defaults to the size of
    /// the eligible set
    #[serde(default)]
    pub max_attempts: Option<usize>,
    /// Wall-clock budget for one dispatch, in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Provider fleet
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            max_attempts: None,
            request_timeout_secs: None,
            providers: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate a configuration file
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&raw)?;
        info!(path = %path.display(), providers = config.providers.len(), "configuration loaded");
        Ok(config)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(raw: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate eagerly so bad config never reaches selection time
    pub fn validate(&self) -> Result<()> {
        // Unknown strategy is a setup failure, not a selection failure.
        self.strategy.parse::<Strategy>()?;

        for provider in &self.providers {
            Url::parse(&provider.endpoint).map_err(|e| {
                GatewayError::Config(format!(
                    "provider {}: invalid endpoint {}: {e}",
                    provider.name, provider.endpoint
                ))
            })?;
        }
        Ok(())
    }

    /// Parsed strategy selector
    pub fn strategy(&self) -> Result<Strategy> {
        self.strategy.parse()
    }

    /// Convert descriptors into registry providers, preserving order
    pub fn providers(&self) -> Vec<Provider> {
        self.providers.iter().cloned().map(Provider::from).collect()
    }

    /// Dispatcher settings derived from this config
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            max_attempts: self.max_attempts,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }
}
