//! Core data types shared across the gateway
//!
//! Defines the service-type taxonomy, provider descriptors, the generic
//! request/result pair exchanged with adapters, and the per-call outcome
//! record fed into the statistics tracker.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::utils::error::GatewayError;

/// Wildcard capability matching every service type
pub const WILDCARD_CAPABILITY: &str = "all";

/// Category of generation a request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// Text generation (chat/completion style)
    Text,
    /// Image generation
    Image,
    /// Speech synthesis
    Tts,
}

impl ServiceType {
    /// Canonical capability string for this service type
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Text => "text",
            ServiceType::Image => "image",
            ServiceType::Tts => "tts",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(ServiceType::Text),
            "image" => Ok(ServiceType::Image),
            "tts" => Ok(ServiceType::Tts),
            other => Err(GatewayError::Config(format!(
                "unknown service type: {other}"
            ))),
        }
    }
}

/// Opaque secret handle for a provider credential
///
/// The raw value is reachable only through [`Credential::expose`]; both
/// `Debug` and `Display` render a redacted placeholder so the secret cannot
/// leak through log output or error messages.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Access the raw secret for building an outbound request
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the credential is empty (unset in configuration)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

/// A configured backend provider
///
/// Capability matching is exact string equality against the rendered
/// service-type name, or the wildcard `"all"`. No partial matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    /// Unique provider name (registry key)
    pub name: String,
    /// Base address of the vendor API
    pub endpoint: String,
    /// Opaque secret handle, never logged
    #[serde(default)]
    pub credential: Credential,
    /// Service types this provider can serve
    #[serde(default)]
    pub capabilities: HashSet<String>,
    /// Lower value preferred when scores tie
    #[serde(default)]
    pub priority: i32,
    /// Relative selection share for weighted ranking
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Disabled providers are never candidates
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_weight() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

impl Provider {
    /// Whether this provider can serve the given service type
    pub fn serves(&self, service_type: ServiceType) -> bool {
        self.capabilities.contains(service_type.as_str())
            || self.capabilities.contains(WILDCARD_CAPABILITY)
    }
}

/// Generic generation request, vendor-agnostic
///
/// Adapters translate this into the vendor wire format. Speech-specific
/// fields are ignored by text/image adapters and vice versa.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenericRequest {
    /// Model identifier, passed through to the vendor
    #[serde(default)]
    pub model: String,
    /// Primary prompt (user message, image prompt, or text to synthesize)
    #[serde(default)]
    pub prompt: String,
    /// Optional system prompt for text generation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Input image references for multimodal requests
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Voice name for speech synthesis
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    /// Speech rate multiplier (0.5 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Speech pitch multiplier (0.5 - 2.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    /// Audio container format (mp3, wav, ogg)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Free-form vendor options
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub options: HashMap<String, serde_json::Value>,
}

/// Generic generation result, vendor-agnostic
///
/// `provider` and `latency` are filled in by the dispatcher after a
/// successful adapter call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenericResult {
    /// Name of the provider that served the request
    #[serde(default)]
    pub provider: String,
    /// Generated text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Generated image references (URLs or base64)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Synthesized audio, base64 encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    /// Path the audio was written to, when file output is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    /// Vendor-reported usage accounting
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub usage: HashMap<String, serde_json::Value>,
    /// Wall-clock latency of the winning adapter call
    #[serde(default)]
    pub latency: Duration,
}

/// Outcome of one adapter invocation, recorded by the dispatcher
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Provider that was invoked
    pub provider: String,
    /// Whether the call succeeded
    pub succeeded: bool,
    /// Wall-clock latency of the call
    pub latency: Duration,
    /// Error detail for failed calls
    pub error_detail: Option<String>,
}

impl Outcome {
    /// Outcome for a successful call
    pub fn success(provider: impl Into<String>, latency: Duration) -> Self {
        Self {
            provider: provider.into(),
            succeeded: true,
            latency,
            error_detail: None,
        }
    }

    /// Outcome for a failed call
    pub fn failure(
        provider: impl Into<String>,
        latency: Duration,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            succeeded: false,
            latency,
            error_detail: Some(detail.into()),
        }
    }
}
