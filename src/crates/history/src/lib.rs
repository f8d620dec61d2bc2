//! Conversation history for stateless LLM endpoints.
//!
//! The remote model remembers nothing between calls, so every request carries
//! the whole conversation. This crate keeps that conversation:
//!
//! - [`HistoryStore`] accumulates user and assistant turns, tracks the tokens
//!   each priced assistant turn consumed, and evicts the oldest exchanges when
//!   the context window would overflow.
//! - [`normalizer`] maps caller payloads (plain strings, kind-keyed blocks,
//!   type-tagged blocks) into one canonical [`ContentPart`] union and back into
//!   either [`WireFormat`].
//!
//! Transport, credentials and file handling are deliberately absent; see the
//! `llm` crate for a caller that wires them around this store.
//!
//! # Example
//!
//! ```rust
//! use history::{HistoryStore, Role, TokenCost, WireFormat};
//! use serde_json::json;
//!
//! let mut history = HistoryStore::new("You are a helpful assistant.", 180_000)?
//!     .with_wire_format(WireFormat::Messages);
//!
//! history.append(Role::User, "What is Rust?", None);
//! history.enforce_limit();
//!
//! let request_messages = history.messages();
//! assert_eq!(request_messages[0].content[0], json!({"type": "text", "text": "What is Rust?"}));
//!
//! // After the remote call returns
//! history.append(
//!     Role::Assistant,
//!     json!([{"type": "text", "text": "A systems programming language."}]),
//!     TokenCost::from_value(&json!({"input_tokens": 20, "output_tokens": 8})),
//! );
//! assert_eq!(history.total_tokens(), 10 + 28);
//! # Ok::<(), history::HistoryError>(())
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod normalizer;
pub mod store;
pub mod usage;

// Re-export commonly used types
pub use config::HistoryConfig;
pub use content::{ContentPart, DocumentFormat, ImageFormat, Role, Turn};
pub use error::{HistoryError, Result};
pub use normalizer::{to_canonical, to_wire, WireFormat, WireTurn};
pub use store::{HistoryStore, TRUNCATION_NOTICE, TRUNCATION_NOTICE_TOKENS};
pub use usage::TokenCost;
