//! Adapter for hosted speech-synthesis APIs
//!
//! Serves the `tts` service type only. The vendor returns raw audio bytes;
//! the adapter base64-encodes them into the result and can optionally persist
//! them to disk.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::core::adapter::{Adapter, AdapterError};
use crate::core::types::{Credential, GenericRequest, GenericResult, Provider, ServiceType};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_FORMAT: &str = "mp3";

/// Adapter for one speech-synthesis provider
pub struct SpeechAdapter {
    endpoint: String,
    credential: Credential,
    client: reqwest::Client,
    /// When set, synthesized audio is also written under this directory
    output_dir: Option<PathBuf>,
}

impl SpeechAdapter {
    /// Create an adapter for the given endpoint and credential
    pub fn new(endpoint: impl Into<String>, credential: Credential) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            credential,
            client,
            output_dir: None,
        }
    }

    /// Create an adapter from a registry provider descriptor
    pub fn for_provider(provider: &Provider) -> Self {
        Self::new(provider.endpoint.clone(), provider.credential.clone())
    }

    /// Also persist synthesized audio under `dir`
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    async fn synthesize(&self, request: &GenericRequest) -> Result<GenericResult, AdapterError> {
        let format = request.format.as_deref().unwrap_or(DEFAULT_FORMAT);
        // Vendors take prosody adjustments as signed percentages relative to
        // the neutral rate of 1.0.
        let rate = (request.speed.unwrap_or(1.0) * 100.0 - 100.0).round() as i64;
        let pitch = (request.pitch.unwrap_or(1.0) * 100.0 - 100.0).round() as i64;

        let body = json!({
            "model": request.model,
            "input": request.prompt,
            "voice": request.voice,
            "outputFormat": format,
            "prosody": {"rate": rate, "pitch": pitch},
        });

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.endpoint))
            .header("Ocp-Apim-Subscription-Key", self.credential.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AdapterError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(AdapterError::permanent("speech synthesis returned no audio"));
        }

        let mut result = GenericResult {
            audio: Some(BASE64.encode(&audio)),
            ..Default::default()
        };

        if let Some(dir) = &self.output_dir {
            let path = dir.join(format!("{}.{format}", Utc::now().timestamp_millis()));
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| AdapterError::permanent(format!("create audio dir: {e}")))?;
            tokio::fs::write(&path, &audio)
                .await
                .map_err(|e| AdapterError::permanent(format!("write audio file: {e}")))?;
            debug!(path = %path.display(), bytes = audio.len(), "audio written");
            result.audio_path = Some(path.display().to_string());
        }

        Ok(result)
    }
}

#[async_trait]
impl Adapter for SpeechAdapter {
    async fn invoke(
        &self,
        service_type: ServiceType,
        request: &GenericRequest,
    ) -> Result<GenericResult, AdapterError> {
        match service_type {
            ServiceType::Tts => self.synthesize(request).await,
            other => Err(AdapterError::permanent(format!(
                "speech adapter does not serve {other}"
            ))),
        }
    }
}
