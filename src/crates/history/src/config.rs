//! Construction-time configuration for a [`HistoryStore`](crate::HistoryStore).

use serde::{Deserialize, Serialize};

use crate::error::{HistoryError, Result};
use crate::normalizer::WireFormat;

/// Settings consumed once when a conversation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// System prompt; only its length is used, for the initial estimate.
    #[serde(default)]
    pub system_prompt: String,

    /// Context-window ceiling in tokens. Must be positive.
    #[serde(default = "default_context_window_tokens")]
    pub context_window_tokens: u64,

    /// Wire variant the conversation is transmitted in.
    #[serde(default)]
    pub wire_format: WireFormat,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            system_prompt: String::new(),
            context_window_tokens: default_context_window_tokens(),
            wire_format: WireFormat::default(),
        }
    }
}

impl HistoryConfig {
    /// Create a configuration with the default wire format.
    pub fn new(system_prompt: impl Into<String>, context_window_tokens: u64) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            context_window_tokens,
            wire_format: WireFormat::default(),
        }
    }

    /// Set the wire format.
    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    /// Reject settings no later operation could recover from.
    pub fn validate(&self) -> Result<()> {
        if self.context_window_tokens == 0 {
            return Err(HistoryError::Config(
                "context_window_tokens must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_context_window_tokens() -> u64 {
    180_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HistoryConfig::default();
        assert_eq!(config.context_window_tokens, 180_000);
        assert_eq!(config.wire_format, WireFormat::Converse);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = HistoryConfig::new("prompt", 0);
        assert!(matches!(config.validate(), Err(HistoryError::Config(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: HistoryConfig = serde_json::from_str(
            r#"{"system_prompt": "Be brief.", "wire_format": "invoke"}"#,
        )
        .unwrap();
        assert_eq!(config.system_prompt, "Be brief.");
        assert_eq!(config.context_window_tokens, 180_000);
        assert_eq!(config.wire_format, WireFormat::Messages);
    }
}
