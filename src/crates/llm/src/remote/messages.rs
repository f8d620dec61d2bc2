//! HTTP client for Messages-style endpoints.
//!
//! Sends the conversation as type-tagged blocks to `{base_url}/v1/messages`
//! and returns the assistant content and usage untouched.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::MessagesClient;
//! use llm::config::RemoteLlmConfig;
//!
//! let config = RemoteLlmConfig::from_env("ANTHROPIC_API_KEY", "https://api.anthropic.com")?;
//! let client = MessagesClient::new(config)?;
//! ```

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::transport::{ChatReply, ChatRequest, ChatTransport};
use async_trait::async_trait;
use history::{TokenCost, WireFormat, WireTurn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API client.
#[derive(Clone)]
pub struct MessagesClient {
    config: RemoteLlmConfig,
    api_key: String,
    client: Client,
}

impl MessagesClient {
    /// Create a new client, resolving the API key from the configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the request body.
    ///
    /// Sampling overrides are left out when reasoning is enabled, since the
    /// endpoint rejects them alongside a thinking budget. Extra request fields
    /// are merged last and replace generated keys of the same name.
    fn build_body(&self, request: &ChatRequest) -> Result<Value> {
        let thinking = request
            .reasoning_budget_tokens
            .map(|budget_tokens| ThinkingConfig {
                kind: "enabled",
                budget_tokens,
            });
        let sampling = thinking.is_none();

        let body = MessagesRequest {
            model: &request.model,
            messages: &request.messages,
            system: request.system.as_deref(),
            max_tokens: request.max_tokens,
            temperature: request.temperature.filter(|_| sampling),
            top_p: request.top_p.filter(|_| sampling),
            thinking,
        };

        let mut body = serde_json::to_value(body)?;
        if let Value::Object(map) = &mut body {
            for (key, value) in &request.extra {
                map.insert(key.clone(), value.clone());
            }
        }
        Ok(body)
    }

    fn convert_response(&self, response: MessagesResponse) -> ChatReply {
        let usage = response.usage.as_ref().and_then(TokenCost::from_value);
        if usage.is_none() {
            warn!("Response did not include usage information");
        }

        ChatReply {
            content: response.content,
            usage,
            stop_reason: response.stop_reason,
        }
    }
}

#[async_trait]
impl ChatTransport for MessagesClient {
    fn wire_format(&self) -> WireFormat {
        WireFormat::Messages
    }

    async fn send(&self, request: ChatRequest) -> Result<ChatReply> {
        let url = self.endpoint();
        let body = self.build_body(&request)?;
        debug!(url = %url, model = %request.model, turns = request.messages.len(), "Sending request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 => LlmError::AuthenticationError(error_text),
                429 => LlmError::RateLimitExceeded(error_text),
                _ => LlmError::ProviderError(format!("API error {}: {}", status, error_text)),
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        Ok(self.convert_response(parsed))
    }
}

// Messages API types
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    messages: &'a [WireTurn],
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
struct ThinkingConfig {
    #[serde(rename = "type")]
    kind: &'static str,
    budget_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Value,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Value>,
}
