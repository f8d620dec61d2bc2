//! The seam between the agent and a remote endpoint.
//!
//! An agent never talks HTTP itself. It hands a [`ChatRequest`] holding the
//! serialized history to a [`ChatTransport`] and gets one assistant turn back.
//! Implement the trait to plug in another provider or a test double.
//!
//! ```rust,ignore
//! use llm::transport::{ChatReply, ChatRequest, ChatTransport};
//! use history::WireFormat;
//!
//! struct Echo;
//!
//! #[async_trait::async_trait]
//! impl ChatTransport for Echo {
//!     fn wire_format(&self) -> WireFormat {
//!         WireFormat::Converse
//!     }
//!
//!     async fn send(&self, request: ChatRequest) -> llm::Result<ChatReply> {
//!         let last = request.messages.last().cloned();
//!         Ok(ChatReply::new(serde_json::json!(last.map(|m| m.content))))
//!     }
//! }
//! ```

use crate::error::Result;
use async_trait::async_trait;
use history::{TokenCost, WireFormat, WireTurn};
use serde_json::{Map, Value};

/// Everything a transport needs for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier
    pub model: String,

    /// System prompt, sent separately from the turns
    pub system: Option<String>,

    /// Full conversation in the transport's wire format
    pub messages: Vec<WireTurn>,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Nucleus sampling cutoff
    pub top_p: Option<f32>,

    /// Extended reasoning budget; `None` disables reasoning
    pub reasoning_budget_tokens: Option<u32>,

    /// Provider-specific fields merged into the request body
    pub extra: Map<String, Value>,
}

impl ChatRequest {
    /// Create a request with no sampling overrides.
    pub fn new(model: impl Into<String>, messages: Vec<WireTurn>, max_tokens: u32) -> Self {
        Self {
            model: model.into(),
            system: None,
            messages,
            max_tokens,
            temperature: None,
            top_p: None,
            reasoning_budget_tokens: None,
            extra: Map::new(),
        }
    }

    /// Set the system prompt; an empty prompt is dropped.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        let system = system.into();
        self.system = (!system.is_empty()).then_some(system);
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the nucleus sampling cutoff.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Enable extended reasoning with the given budget.
    pub fn with_reasoning_budget(mut self, budget: Option<u32>) -> Self {
        self.reasoning_budget_tokens = budget;
        self
    }

    /// Add provider-specific body fields; they override generated ones.
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra.extend(extra);
        self
    }
}

/// One assistant turn returned by a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    /// Content blocks as returned by the provider
    pub content: Value,

    /// Usage reported by the provider, if any
    pub usage: Option<TokenCost>,

    /// Why generation stopped
    pub stop_reason: Option<String>,
}

impl ChatReply {
    /// Create a reply without usage.
    pub fn new(content: Value) -> Self {
        Self {
            content,
            usage: None,
            stop_reason: None,
        }
    }

    /// Attach usage.
    pub fn with_usage(mut self, usage: TokenCost) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Attach a stop reason.
    pub fn with_stop_reason(mut self, reason: impl Into<String>) -> Self {
        self.stop_reason = Some(reason.into());
        self
    }
}

/// A remote, stateless chat endpoint.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Wire shape this transport expects in [`ChatRequest::messages`].
    fn wire_format(&self) -> WireFormat;

    /// Send the conversation and return the next assistant turn.
    async fn send(&self, request: ChatRequest) -> Result<ChatReply>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_system_dropped() {
        let request = ChatRequest::new("model", Vec::new(), 100).with_system("");
        assert_eq!(request.system, None);

        let request = request.with_system("Be kind.");
        assert_eq!(request.system.as_deref(), Some("Be kind."));
    }

    #[test]
    fn test_extra_fields_accumulate() {
        let mut first = Map::new();
        first.insert("stop_sequences".to_string(), json!(["END"]));
        let mut second = Map::new();
        second.insert("metadata".to_string(), json!({"user_id": "u1"}));

        let request = ChatRequest::new("model", Vec::new(), 100)
            .with_extra(first)
            .with_extra(second);
        assert_eq!(request.extra.len(), 2);
        assert_eq!(request.extra["stop_sequences"], json!(["END"]));
    }

    #[test]
    fn test_reply_builder() {
        let reply = ChatReply::new(json!([{"text": "hi"}]))
            .with_usage(TokenCost::new(3, 1))
            .with_stop_reason("end_turn");
        assert_eq!(reply.usage, Some(TokenCost::new(3, 1)));
        assert_eq!(reply.stop_reason.as_deref(), Some("end_turn"));
    }
}
