//! Token accounting for completed assistant turns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tokens consumed by one remote call, as reported by the provider.
///
/// Accepts both the camelCase (`inputTokens`) and snake_case
/// (`input_tokens`) spellings; missing fields count as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenCost {
    /// Prompt tokens billed for the call
    #[serde(default, alias = "inputTokens")]
    pub input_tokens: u64,

    /// Completion tokens billed for the call
    #[serde(default, alias = "outputTokens")]
    pub output_tokens: u64,
}

impl TokenCost {
    /// Create a new cost record.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Sum of input and output tokens, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }

    /// Read a provider usage object.
    ///
    /// Returns `None` for `null`, non-objects and empty objects, so an empty
    /// usage block is treated the same as no usage at all.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) if !map.is_empty() => {
                serde_json::from_value(value.clone()).ok()
            }
            _ => None,
        }
    }
}
