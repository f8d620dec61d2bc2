//! A conversational agent over a stateless endpoint.
//!
//! Each exchange follows the same sequence:
//!
//! 1. append the user turn to the history
//! 2. evict old turns if the context window would overflow
//! 3. send the whole history through the transport
//! 4. append the assistant turn with the usage the provider reported
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::agent::Agent;
//! use llm::config::{AgentConfig, RemoteLlmConfig};
//! use llm::remote::MessagesClient;
//! use std::sync::Arc;
//!
//! let config = AgentConfig::load("agent.toml").await?;
//! let transport = Arc::new(MessagesClient::new(config.remote.clone())?);
//! let mut agent = Agent::new("helper", "You are a helpful assistant.", config, transport)?;
//!
//! let response = agent.run("What is the capital of France?").await?;
//! println!("{}", response.text);
//!
//! let response = agent
//!     .run_with_attachments("Summarize this report", &[] as &[&str], &["report.pdf"])
//!     .await?;
//! ```

use crate::attachment::build_user_parts;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::transport::{ChatRequest, ChatTransport};
use history::{to_canonical, ContentPart, HistoryStore, Role, TokenCost, WireTurn};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Result of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResponse {
    /// Concatenated text blocks of the reply
    pub text: String,

    /// Reasoning emitted by the model, if any
    pub reasoning: Option<String>,

    /// Raw reply content, as stored in the history
    pub content: Value,

    /// Usage reported for the call
    pub usage: Option<TokenCost>,

    /// Why generation stopped
    pub stop_reason: Option<String>,
}

/// On-disk shape of an exported conversation.
#[derive(Debug, Serialize)]
struct HistoryExport<'a> {
    agent_name: &'a str,
    model: &'a str,
    system: &'a str,
    total_tokens: u64,
    messages: Vec<WireTurn>,
    api_type: &'static str,
}

/// Conversational agent owning one conversation.
pub struct Agent {
    name: String,
    system: String,
    config: AgentConfig,
    transport: Arc<dyn ChatTransport>,
    history: HistoryStore,
}

impl Agent {
    /// Create an agent with an empty history sized from `config.model`.
    pub fn new(
        name: impl Into<String>,
        system: impl Into<String>,
        config: AgentConfig,
        transport: Arc<dyn ChatTransport>,
    ) -> Result<Self> {
        let name = name.into();
        let system = system.into();
        config.validate()?;

        let history = Self::new_history(&system, &config, transport.as_ref())?;
        info!(
            agent = %name,
            model = %config.model.model,
            wire_format = %history.wire_format(),
            "Agent initialized"
        );

        Ok(Self {
            name,
            system,
            config,
            transport,
            history,
        })
    }

    fn new_history(
        system: &str,
        config: &AgentConfig,
        transport: &dyn ChatTransport,
    ) -> Result<HistoryStore> {
        let history_config = config.model.history_config(system, transport.wire_format());
        Ok(HistoryStore::from_config(&history_config)?)
    }

    /// Run one exchange with text or pre-built content.
    ///
    /// Accepts a string, a block list in either wire shape, or an object with
    /// a `content` key.
    pub async fn run(&mut self, input: impl Into<Value>) -> Result<AgentResponse> {
        let parts = to_canonical(&input.into());
        self.exchange(parts).await
    }

    /// Run one exchange with text plus image and document files.
    pub async fn run_with_attachments<P: AsRef<Path>>(
        &mut self,
        text: &str,
        image_paths: &[P],
        document_paths: &[P],
    ) -> Result<AgentResponse> {
        let parts = build_user_parts(text, image_paths, document_paths).await?;
        self.exchange(parts).await
    }

    // The pending user turn is rolled back when the call fails.
    async fn exchange(&mut self, parts: Vec<ContentPart>) -> Result<AgentResponse> {
        let kinds: Vec<&str> = parts.iter().map(ContentPart::kind).collect();
        info!(agent = %self.name, content = ?kinds, "Received user input");

        self.history.append_parts(Role::User, parts, None);
        self.history.enforce_limit();

        let request = self.build_request();
        let reply = match self.transport.send(request).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(agent = %self.name, model = %self.config.model.model, error = %e, "Remote call failed");
                self.history.discard_unanswered();
                return Err(e);
            }
        };

        let (reasoning, text) = extract_reasoning_and_response(&reply.content);
        if let Some(reasoning) = &reasoning {
            debug!(agent = %self.name, reasoning = %reasoning, "Model reasoning");
        }
        debug!(agent = %self.name, output = %text, "Model output");

        self.history
            .append(Role::Assistant, reply.content.clone(), reply.usage);

        Ok(AgentResponse {
            text,
            reasoning,
            content: reply.content,
            usage: reply.usage,
            stop_reason: reply.stop_reason,
        })
    }

    fn build_request(&self) -> ChatRequest {
        let model = &self.config.model;
        ChatRequest::new(model.model.clone(), self.history.messages(), model.max_tokens)
            .with_system(self.system.clone())
            .with_temperature(model.temperature)
            .with_top_p(model.top_p)
            .with_reasoning_budget(model.reasoning_budget())
            .with_extra(model.request_params.clone())
    }

    /// Start a new conversation, discarding the current history.
    pub fn reset(&mut self) -> Result<()> {
        self.history = Self::new_history(&self.system, &self.config, self.transport.as_ref())?;
        debug!(agent = %self.name, "History reset");
        Ok(())
    }

    /// The conversation so far.
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Write the conversation and its metadata to a JSON file.
    pub async fn export_history(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let export = HistoryExport {
            agent_name: &self.name,
            model: &self.config.model.model,
            system: &self.system,
            total_tokens: self.history.total_tokens(),
            messages: self.history.messages(),
            api_type: self.history.wire_format().as_str(),
        };

        let json = serde_json::to_string_pretty(&export)?;
        tokio::fs::write(path, json).await?;
        info!(agent = %self.name, path = %path.display(), turns = self.history.len(), "Exported history");
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Split reply content into reasoning and response text.
///
/// Understands both wire shapes:
/// - Messages: `{"type": "text"}` and `{"type": "thinking"}` blocks
/// - Converse: `{"text": ..}`, `{"reasoning": ..}` and
///   `{"reasoningContent": {"reasoningText": {"text": ..}}}` blocks
///
/// Multiple reasoning blocks are joined with newlines.
pub fn extract_reasoning_and_response(content: &Value) -> (Option<String>, String) {
    let mut reasoning: Vec<String> = Vec::new();
    let mut response = String::new();

    let blocks = match content {
        Value::Array(blocks) => blocks.as_slice(),
        Value::String(text) => return (None, text.clone()),
        _ => &[],
    };

    for block in blocks {
        match block.get("type").and_then(Value::as_str) {
            Some("text") => {
                if let Some(text) = block.get("text").and_then(Value::as_str) {
                    response.push_str(text);
                }
            }
            Some("thinking") => {
                if let Some(text) = block
                    .get("thinking")
                    .or_else(|| block.get("content"))
                    .and_then(Value::as_str)
                {
                    reasoning.push(text.to_string());
                }
            }
            Some(_) => {}
            None => {
                if let Some(text) = converse_reasoning(block) {
                    reasoning.push(text);
                } else if let Some(text) = block.get("text").and_then(Value::as_str) {
                    response.push_str(text);
                }
            }
        }
    }

    let reasoning = (!reasoning.is_empty()).then(|| reasoning.join("\n"));
    (reasoning, response)
}

fn converse_reasoning(block: &Value) -> Option<String> {
    if let Some(reasoning) = block.get("reasoning") {
        return match reasoning {
            Value::String(text) => Some(text.clone()),
            other => other
                .get("reasoningText")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
    }

    block
        .get("reasoningContent")?
        .get("reasoningText")?
        .get("text")?
        .as_str()
        .map(str::to_string)
}
