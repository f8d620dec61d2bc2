//! Conversational agent built on the `history` crate.
//!
//! The remote endpoint is stateless, so the [`Agent`] resends the whole
//! conversation on every call and lets [`history::HistoryStore`] keep it
//! inside the model's context window.
//!
//! # Modules
//!
//! - [`agent`] - the exchange loop and reasoning extraction
//! - [`attachment`] - images and documents read from disk
//! - [`transport`] - the [`ChatTransport`] seam the agent sends through
//! - [`remote`] - HTTP transports (feature `remote`)
//! - [`config`] - TOML/YAML configuration
//! - [`logging`] - subscriber setup
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{init_logging, Agent, AgentConfig, MessagesClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::load("agent.toml").await?;
//!     init_logging(&config.logging);
//!
//!     let transport = Arc::new(MessagesClient::new(config.remote.clone())?);
//!     let mut agent = Agent::new("helper", "You are a helpful assistant.", config, transport)?;
//!
//!     let response = agent.run("Explain ownership in one sentence.").await?;
//!     if let Some(reasoning) = &response.reasoning {
//!         println!("Thinking: {}", reasoning);
//!     }
//!     println!("{}", response.text);
//!     println!("Context used: {} tokens", agent.history().total_tokens());
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod attachment;
pub mod config;
pub mod error;
pub mod logging;
pub mod transport;

#[cfg(feature = "remote")]
pub mod remote;

// Re-export commonly used types
pub use agent::{extract_reasoning_and_response, Agent, AgentResponse};
pub use config::{AgentConfig, LoggingConfig, ModelConfig, RemoteLlmConfig};
pub use error::{LlmError, Result};
pub use logging::init_logging;
pub use transport::{ChatReply, ChatRequest, ChatTransport};

#[cfg(feature = "remote")]
pub use remote::MessagesClient;
