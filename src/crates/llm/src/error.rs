//! Error types for the agent layer.

use history::HistoryError;
use thiserror::Error;

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur around a conversation: configuration, attachments
/// and the remote call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Failed to serialize/deserialize data.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Invalid response from provider.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// General provider error.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Attachment path does not exist.
    #[error("Attachment not found: {0}")]
    AttachmentNotFound(String),

    /// Attachment exceeds the per-file size ceiling.
    #[error("Attachment {path} is too large: {size} bytes (max {max} bytes)")]
    AttachmentTooLarge {
        path: String,
        size: u64,
        max: u64,
    },

    /// Too many attachments in one request.
    #[error("Too many attachments: {count} (max {max})")]
    TooManyAttachments { count: usize, max: usize },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Conversation history rejected its configuration.
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl LlmError {
    /// Check if this error is worth retrying.
    ///
    /// No retry is performed here; callers decide.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::HttpError(_) | LlmError::RateLimitExceeded(_))
    }

    /// Check if this error is due to authentication.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            LlmError::AuthenticationError(_) | LlmError::ApiKeyNotFound(_)
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for LlmError {
    fn from(err: serde_yaml::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

impl From<toml::de::Error> for LlmError {
    fn from(err: toml::de::Error) -> Self {
        LlmError::ConfigError(err.to_string())
    }
}
