//! Configuration for the agent, the remote endpoint and logging.
//!
//! Loaded from a TOML or YAML file (picked by extension); every section and
//! field has a default, so an empty file is valid.
//!
//! ```toml
//! [model]
//! model = "anthropic.claude-3-7-sonnet-20250219-v1:0"
//! max_tokens = 4096
//! context_window_tokens = 180000
//! enable_reasoning = true
//! reasoning_budget_tokens = 2000
//!
//! [remote]
//! base_url = "https://api.anthropic.com"
//! api_key_env = "ANTHROPIC_API_KEY"
//! timeout_secs = 60
//!
//! [logging]
//! level = "debug"
//! ```

use crate::error::{LlmError, Result};
use history::{HistoryConfig, WireFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Top-level agent configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Model parameters
    #[serde(default)]
    pub model: ModelConfig,

    /// Remote endpoint settings
    #[serde(default)]
    pub remote: RemoteLlmConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Load configuration from a file, detecting the format from its extension.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                LlmError::ConfigError(format!(
                    "Unable to determine file extension for {:?}",
                    path
                ))
            })?;

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            LlmError::ConfigError(format!("Failed to read config {:?}: {}", path, e))
        })?;

        let config = match extension.as_str() {
            "toml" => Self::from_toml_str(&content)?,
            "yaml" | "yml" => Self::from_yaml_str(&content)?,
            other => {
                return Err(LlmError::ConfigError(format!(
                    "Unsupported config file extension: {}",
                    other
                )))
            }
        };

        debug!(path = %path.display(), "Loaded agent configuration");
        Ok(config)
    }

    /// Parse TOML configuration.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings before any conversation starts.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()
    }
}

/// Parameters sent with every request, plus the context-window size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier.
    pub model: String,

    /// Maximum tokens to generate per turn.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Nucleus sampling cutoff.
    pub top_p: f32,

    /// Context-window ceiling for the conversation history.
    pub context_window_tokens: u64,

    /// Ask the model for extended reasoning.
    pub enable_reasoning: bool,

    /// Token budget for the reasoning process.
    pub reasoning_budget_tokens: u32,

    /// Extra fields merged into every request body.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub request_params: Map<String, Value>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: "anthropic.claude-3-7-sonnet-20250219-v1:0".to_string(),
            max_tokens: 4096,
            temperature: 1.0,
            top_p: 0.9,
            context_window_tokens: 180_000,
            enable_reasoning: true,
            reasoning_budget_tokens: 2000,
            request_params: Map::new(),
        }
    }
}

impl ModelConfig {
    /// Create a model configuration with default parameters.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the context-window size.
    pub fn with_context_window(mut self, tokens: u64) -> Self {
        self.context_window_tokens = tokens;
        self
    }

    /// Set the maximum output tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable extended reasoning.
    pub fn with_reasoning(mut self, enabled: bool) -> Self {
        self.enable_reasoning = enabled;
        self
    }

    /// Add a field merged into every request body.
    pub fn with_request_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.request_params.insert(key.into(), value);
        self
    }

    /// Reasoning budget to send, if reasoning is enabled.
    pub fn reasoning_budget(&self) -> Option<u32> {
        self.enable_reasoning.then_some(self.reasoning_budget_tokens)
    }

    /// History configuration for a conversation using this model.
    pub fn history_config(
        &self,
        system_prompt: impl Into<String>,
        wire_format: WireFormat,
    ) -> HistoryConfig {
        HistoryConfig::new(system_prompt, self.context_window_tokens).with_wire_format(wire_format)
    }

    fn validate(&self) -> Result<()> {
        if self.context_window_tokens == 0 {
            return Err(LlmError::ConfigError(
                "model.context_window_tokens must be greater than zero".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(LlmError::ConfigError(
                "model.max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.enable_reasoning && self.reasoning_budget_tokens >= self.max_tokens {
            return Err(LlmError::ConfigError(format!(
                "model.reasoning_budget_tokens ({}) must be below model.max_tokens ({})",
                self.reasoning_budget_tokens, self.max_tokens
            )));
        }
        Ok(())
    }
}

/// Configuration for the remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLlmConfig {
    /// Base URL for the API.
    pub base_url: String,

    /// API key. Takes precedence over `api_key_env`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Request timeout, written in seconds.
    #[serde(rename = "timeout_secs", with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for RemoteLlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key: None,
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl RemoteLlmConfig {
    /// Create a configuration with an explicit key.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    /// Create configuration reading the key from an environment variable.
    pub fn from_env(env_var: &str, base_url: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The explicit key, or the value of `api_key_env`.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        std::env::var(&self.api_key_env).map_err(|_| {
            LlmError::ApiKeyNotFound(format!("Environment variable: {}", self.api_key_env))
        })
    }
}

// Durations as fractional seconds.
mod duration_secs {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        duration: &Duration,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(de::Error::custom)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Maximum level: trace, debug, info, warn or error.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_model_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.max_tokens, 4096);
        assert_eq!(config.context_window_tokens, 180_000);
        assert_eq!(config.reasoning_budget(), Some(2000));
        assert_eq!(config.with_reasoning(false).reasoning_budget(), None);
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = AgentConfig::from_toml_str("").unwrap();
        assert_eq!(config.model.top_p, 0.9);
        assert_eq!(config.remote.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_sections() {
        let config = AgentConfig::from_toml_str(
            r#"
            [model]
            model = "claude-test"
            context_window_tokens = 5000
            enable_reasoning = false

            [remote]
            base_url = "http://localhost:9000"
            timeout_secs = 5

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.model.model, "claude-test");
        assert_eq!(config.model.context_window_tokens, 5000);
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.remote.base_url, "http://localhost:9000");
        assert_eq!(config.remote.timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_yaml_config() {
        let config = AgentConfig::from_yaml_str(
            "model:\n  max_tokens: 8000\n  reasoning_budget_tokens: 4000\n",
        )
        .unwrap();
        assert_eq!(config.model.max_tokens, 8000);
        assert_eq!(config.model.reasoning_budget(), Some(4000));
    }

    #[test]
    fn test_sub_second_timeout_kept() {
        let config = RemoteLlmConfig::default().with_timeout(Duration::from_millis(500));
        assert_eq!(config.timeout(), Duration::from_millis(500));

        let config = AgentConfig::from_toml_str("[remote]\ntimeout_secs = 2.5\n").unwrap();
        assert_eq!(config.remote.timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn test_negative_timeout_rejected() {
        assert!(AgentConfig::from_toml_str("[remote]\ntimeout_secs = -1\n").is_err());
    }

    #[test]
    fn test_request_params() {
        let config = AgentConfig::from_toml_str(
            r#"
            [model.request_params]
            stop_sequences = ["END"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.model.request_params["stop_sequences"],
            serde_json::json!(["END"])
        );

        let model = ModelConfig::default().with_request_param("top_k", serde_json::json!(40));
        assert_eq!(model.request_params.len(), 1);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let err = AgentConfig::from_toml_str("[model]\ncontext_window_tokens = 0\n").unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn test_reasoning_budget_must_fit() {
        let err = AgentConfig::from_toml_str(
            "[model]\nmax_tokens = 1000\nreasoning_budget_tokens = 2000\n",
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = RemoteLlmConfig::new("test-key", "https://api.anthropic.com");
        assert_eq!(config.resolve_api_key().unwrap(), "test-key");
    }

    #[test]
    fn test_missing_api_key_env() {
        let config = RemoteLlmConfig {
            api_key_env: "HISTORY_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..RemoteLlmConfig::default()
        };
        assert!(matches!(
            config.resolve_api_key(),
            Err(LlmError::ApiKeyNotFound(_))
        ));
    }

    #[test]
    fn test_history_config() {
        let config = ModelConfig::default().with_context_window(1234);
        let history = config.history_config("Be brief.", WireFormat::Messages);
        assert_eq!(history.context_window_tokens, 1234);
        assert_eq!(history.wire_format, WireFormat::Messages);
        assert_eq!(history.system_prompt, "Be brief.");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[model]\nmodel = \"from-file\"").unwrap();

        let config = AgentConfig::load(&path).await.unwrap();
        assert_eq!(config.model.model, "from-file");
    }

    #[tokio::test]
    async fn test_load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.ini");
        std::fs::write(&path, "model = x").unwrap();

        let err = AgentConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }
}
