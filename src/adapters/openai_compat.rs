//! Adapter for OpenAI-compatible vendor APIs
//!
//! Serves the `text` and `image` service types against any endpoint that
//! speaks the OpenAI wire format (`/v1/chat/completions`,
//! `/v1/images/generations`) with bearer authentication.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::adapter::{Adapter, AdapterError};
use crate::core::types::{Credential, GenericRequest, GenericResult, Provider, ServiceType};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// Adapter for one OpenAI-compatible provider
pub struct OpenAiCompatAdapter {
    endpoint: String,
    credential: Credential,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

impl OpenAiCompatAdapter {
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
        }
    }

    /// Create an adapter from a registry provider descriptor
    pub fn for_provider(provider: &Provider) -> Self {
        Self::new(provider.endpoint.clone(), provider.credential.clone())
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, AdapterError> {
        let response = self
            .client
            .post(format!("{}{path}", self.endpoint))
            .bearer_auth(self.credential.expose())
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
        Ok(response)
    }

    async fn generate_text(&self, request: &GenericRequest) -> Result<GenericResult, AdapterError> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let body = json!({
            "model": request.model,
            "messages": messages,
        });

        let parsed: ChatCompletionResponse = self
            .post_json("/v1/chat/completions", body)
            .await?
            .json()
            .await?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AdapterError::permanent("chat completion returned no choices"))?;

        Ok(GenericResult {
            content: Some(content),
            usage: parsed.usage.unwrap_or_default(),
            ..Default::default()
        })
    }

    async fn generate_image(
        &self,
        request: &GenericRequest,
    ) -> Result<GenericResult, AdapterError> {
        let size = request
            .options
            .get("size")
            .and_then(|v| v.as_str())
            .unwrap_or(DEFAULT_IMAGE_SIZE);

        let body = json!({
            "model": request.model,
            "prompt": request.prompt,
            "n": 1,
            "size": size,
        });

        let parsed: ImageGenerationResponse = self
            .post_json("/v1/images/generations", body)
            .await?
            .json()
            .await?;

        let images: Vec<String> = parsed
            .data
            .into_iter()
            .filter_map(|d| d.url.or(d.b64_json))
            .collect();
        if images.is_empty() {
            return Err(AdapterError::permanent("image generation returned no data"));
        }

        Ok(GenericResult {
            images,
            ..Default::default()
        })
    }
}

#[async_trait]
impl Adapter for OpenAiCompatAdapter {
    async fn invoke(
        &self,
        service_type: ServiceType,
        request: &GenericRequest,
    ) -> Result<GenericResult, AdapterError> {
        match service_type {
            ServiceType::Text => self.generate_text(request).await,
            ServiceType::Image => self.generate_image(request).await,
            ServiceType::Tts => Err(AdapterError::permanent(
                "speech synthesis is not supported by the OpenAI-compatible adapter",
            )),
        }
    }
}
