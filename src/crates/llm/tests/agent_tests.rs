//! End-to-end agent tests against a scripted in-memory transport.

use async_trait::async_trait;
use history::{Role, TokenCost, WireFormat, TRUNCATION_NOTICE};
use llm::{Agent, AgentConfig, ChatReply, ChatRequest, ChatTransport, LlmError, ModelConfig};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replays canned replies and records every request it receives.
struct ScriptedTransport {
    format: WireFormat,
    replies: Mutex<VecDeque<llm::Result<ChatReply>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    fn new(format: WireFormat, replies: Vec<llm::Result<ChatReply>>) -> Arc<Self> {
        Arc::new(Self {
            format,
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn wire_format(&self) -> WireFormat {
        self.format
    }

    async fn send(&self, request: ChatRequest) -> llm::Result<ChatReply> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ProviderError("script exhausted".to_string())))
    }
}

fn config(context_window: u64) -> AgentConfig {
    AgentConfig {
        model: ModelConfig::new("test-model")
            .with_context_window(context_window)
            .with_max_tokens(1024)
            .with_reasoning(false),
        ..AgentConfig::default()
    }
}

fn messages_reply(text: &str, input: u64, output: u64) -> llm::Result<ChatReply> {
    Ok(ChatReply::new(json!([{"type": "text", "text": text}]))
        .with_usage(TokenCost::new(input, output))
        .with_stop_reason("end_turn"))
}

fn converse_reply(text: &str, input: u64, output: u64) -> llm::Result<ChatReply> {
    Ok(ChatReply::new(json!([{"text": text}])).with_usage(TokenCost::new(input, output)))
}

#[tokio::test]
async fn test_messages_exchange() {
    let transport = ScriptedTransport::new(
        WireFormat::Messages,
        vec![Ok(ChatReply::new(json!([
            {"type": "thinking", "thinking": "Simple arithmetic."},
            {"type": "text", "text": "4"}
        ]))
        .with_usage(TokenCost::new(20, 5)))],
    );
    let mut agent = Agent::new("calc", "You are a calculator.", config(180_000), transport.clone())
        .unwrap();

    let response = agent.run("What is 2 + 2?").await.unwrap();
    assert_eq!(response.text, "4");
    assert_eq!(response.reasoning.as_deref(), Some("Simple arithmetic."));
    assert_eq!(response.usage, Some(TokenCost::new(20, 5)));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].system.as_deref(), Some("You are a calculator."));
    assert_eq!(requests[0].reasoning_budget_tokens, None);
    assert_eq!(
        requests[0].messages[0].content,
        vec![json!({"type": "text", "text": "What is 2 + 2?"})]
    );

    let history = agent.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.turns()[1].role, Role::Assistant);
    assert_eq!(history.total_tokens(), 10 + 25);
}

#[tokio::test]
async fn test_converse_history_is_resent() {
    let transport = ScriptedTransport::new(
        WireFormat::Converse,
        vec![converse_reply("Hi!", 10, 2), converse_reply("Paris.", 30, 2)],
    );
    let mut agent = Agent::new("geo", "", config(180_000), transport.clone()).unwrap();

    agent.run("Hello").await.unwrap();
    agent.run(json!([{"text": "Capital of France?"}])).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].system, None);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[1].role, Role::Assistant);
    assert_eq!(requests[1].messages[1].content, vec![json!({"text": "Hi!"})]);
    assert_eq!(
        requests[1].messages[2].content,
        vec![json!({"text": "Capital of France?"})]
    );
}

#[tokio::test]
async fn test_eviction_before_send() {
    let transport = ScriptedTransport::new(
        WireFormat::Messages,
        vec![
            messages_reply("one", 100, 50),
            messages_reply("two", 100, 50),
            messages_reply("three", 100, 50),
        ],
    );
    let mut agent = Agent::new("short", "", config(300), transport.clone()).unwrap();

    agent.run("first").await.unwrap();
    agent.run("second").await.unwrap();
    assert_eq!(agent.history().total_tokens(), 310);

    agent.run("third").await.unwrap();

    let requests = transport.requests();
    let third = &requests[2].messages;
    assert_eq!(third.len(), 3);
    assert_eq!(
        third[0].content,
        vec![json!({"type": "text", "text": TRUNCATION_NOTICE})]
    );

    let history = agent.history();
    assert_eq!(
        history.costs(),
        &[TokenCost::new(25, 50), TokenCost::new(100, 50)]
    );
    assert_eq!(history.total_tokens(), 235);
}

#[tokio::test]
async fn test_transport_error_rolls_back_user_turn() {
    let transport = ScriptedTransport::new(
        WireFormat::Messages,
        vec![Err(LlmError::RateLimitExceeded("slow down".to_string()))],
    );
    let mut agent = Agent::new("busy", "", config(180_000), transport).unwrap();

    let err = agent.run("Hello").await.unwrap_err();
    assert!(err.is_retryable());

    let history = agent.history();
    assert!(history.is_empty());
    assert!(history.costs().is_empty());
    assert_eq!(history.total_tokens(), 10);
}

#[tokio::test]
async fn test_window_holds_after_failed_call() {
    let mut replies = vec![Err(LlmError::RateLimitExceeded("slow down".to_string()))];
    replies.extend((0..6).map(|i| messages_reply(&format!("answer {i}"), 100, 50)));
    let transport = ScriptedTransport::new(WireFormat::Messages, replies);
    let mut agent = Agent::new("retry", "", config(300), transport.clone()).unwrap();

    assert!(agent.run("hi").await.is_err());
    for i in 0..6 {
        agent.run(format!("question {i}")).await.unwrap();
    }

    // Every request went out alternating
    for request in transport.requests().iter().skip(1) {
        for (i, turn) in request.messages.iter().enumerate() {
            let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
            assert_eq!(turn.role, expected);
        }
    }

    let mut history = agent.history().clone();
    history.enforce_limit();
    assert!(history.total_tokens() <= 300);
    assert!(agent.history().total_tokens() <= 300 + 150);
}

#[tokio::test]
async fn test_attachments_reach_the_request() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("chart.png");
    let doc = dir.path().join("notes.md");
    std::fs::write(&image, [0x89, b'P', b'N', b'G']).unwrap();
    std::fs::write(&doc, "# Notes").unwrap();

    let transport = ScriptedTransport::new(
        WireFormat::Messages,
        vec![messages_reply("Looks good.", 500, 10)],
    );
    let mut agent = Agent::new("reader", "", config(180_000), transport.clone()).unwrap();

    agent
        .run_with_attachments("Review these", &[&image], &[&doc])
        .await
        .unwrap();

    let content: Vec<Value> = transport.requests()[0].messages[0].content.clone();
    assert_eq!(content[0], json!({"type": "text", "text": "Review these"}));
    assert_eq!(content[1]["type"], json!("image"));
    assert_eq!(content[1]["source"]["media_type"], json!("image/png"));
    assert_eq!(content[2]["type"], json!("document"));
    assert_eq!(content[2]["source"]["media_type"], json!("text/markdown"));
}

#[tokio::test]
async fn test_missing_attachment_sends_nothing() {
    let transport = ScriptedTransport::new(WireFormat::Converse, Vec::new());
    let mut agent = Agent::new("reader", "", config(180_000), transport.clone()).unwrap();

    let err = agent
        .run_with_attachments("Look", &["/nonexistent/picture.png"], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::AttachmentNotFound(_)));
    assert!(transport.requests().is_empty());
    assert!(agent.history().is_empty());
}

#[tokio::test]
async fn test_reset_starts_fresh() {
    let transport = ScriptedTransport::new(WireFormat::Converse, vec![converse_reply("ok", 5, 5)]);
    let mut agent = Agent::new("fresh", "", config(180_000), transport).unwrap();

    agent.run("Hello").await.unwrap();
    assert_eq!(agent.history().len(), 2);

    agent.reset().unwrap();
    assert!(agent.history().is_empty());
    assert_eq!(agent.history().total_tokens(), 10);
    assert_eq!(agent.history().wire_format(), WireFormat::Converse);
}

#[tokio::test]
async fn test_request_params_forwarded() {
    let transport = ScriptedTransport::new(WireFormat::Converse, vec![converse_reply("ok", 5, 5)]);
    let mut config = config(180_000);
    config.model = config
        .model
        .with_request_param("stop_sequences", json!(["END"]));
    let mut agent = Agent::new("params", "", config, transport.clone()).unwrap();

    agent.run("Hello").await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests[0].extra["stop_sequences"], json!(["END"]));
}

#[tokio::test]
async fn test_export_history() {
    let transport = ScriptedTransport::new(
        WireFormat::Messages,
        vec![messages_reply("Hello there.", 40, 10)],
    );
    let mut agent = Agent::new("exporter", "Be kind.", config(180_000), transport).unwrap();
    agent.run("Hi").await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat.json");
    agent.export_history(&path).await.unwrap();

    let exported: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(exported["agent_name"], json!("exporter"));
    assert_eq!(exported["model"], json!("test-model"));
    assert_eq!(exported["system"], json!("Be kind."));
    assert_eq!(exported["total_tokens"], json!(60));
    assert_eq!(exported["api_type"], json!("messages"));
    assert_eq!(
        exported["messages"],
        json!([
            {"role": "user", "content": [{"type": "text", "text": "Hi"}]},
            {"role": "assistant", "content": [{"type": "text", "text": "Hello there."}]}
        ])
    );
}

#[tokio::test]
async fn test_export_to_missing_directory_fails() {
    let transport = ScriptedTransport::new(WireFormat::Converse, Vec::new());
    let agent = Agent::new("exporter", "", config(180_000), transport).unwrap();

    let err = agent
        .export_history("/nonexistent/dir/chat.json")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::Io(_)));
}

#[test]
fn test_invalid_config_rejected() {
    let transport = ScriptedTransport::new(WireFormat::Converse, Vec::new());
    let bad = AgentConfig {
        model: ModelConfig::new("m").with_context_window(0),
        ..AgentConfig::default()
    };
    assert!(matches!(
        Agent::new("bad", "", bad, transport),
        Err(LlmError::ConfigError(_))
    ));
}
