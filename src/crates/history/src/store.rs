//! Conversation log with token accounting and context-window eviction.
//!
//! # Accounting
//!
//! The store starts from a rough estimate of the system prompt (four
//! characters per token, at least 10 tokens) and then adds the usage the
//! provider reports for each assistant turn. User turns are not priced on
//! their own: the provider folds them into the next call's input tokens.
//!
//! # Eviction
//!
//! [`HistoryStore::enforce_limit`] drops the oldest user/assistant pair until
//! the total fits the window. After each drop the new oldest turn is replaced
//! by a short truncation notice and its cost entry is re-priced at
//! [`TRUNCATION_NOTICE_TOKENS`] input tokens, so the model still learns that
//! earlier context existed.
//!
//! ```rust
//! use history::{HistoryStore, Role, TokenCost};
//!
//! let mut history = HistoryStore::new("You are helpful.", 300).unwrap();
//! assert_eq!(history.total_tokens(), 10);
//!
//! for i in 0..3 {
//!     history.append(Role::User, format!("question {i}"), None);
//!     history.enforce_limit();
//!     history.append(Role::Assistant, format!("answer {i}"), Some(TokenCost::new(100, 50)));
//! }
//!
//! assert!(history.turns()[0].text().contains("truncated"));
//! assert_eq!(history.total_tokens(), 235);
//! ```

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::HistoryConfig;
use crate::content::{ContentPart, Role, Turn};
use crate::error::{HistoryError, Result};
use crate::normalizer::{serialize_turns, to_canonical, WireFormat, WireTurn};
use crate::usage::TokenCost;

/// Input-token price assigned to the truncation notice.
pub const TRUNCATION_NOTICE_TOKENS: u64 = 25;

/// Text of the turn that replaces evicted history.
pub const TRUNCATION_NOTICE: &str = "[Earlier history has been truncated.]";

/// Lower bound of the system prompt estimate.
const MIN_SYSTEM_PROMPT_TOKENS: u64 = 10;

/// Characters per token assumed by the system prompt estimate.
const CHARS_PER_TOKEN: u64 = 4;

/// Rough token estimate for a system prompt.
pub fn estimate_system_tokens(system_prompt: &str) -> u64 {
    let chars = system_prompt.chars().count() as u64;
    (chars / CHARS_PER_TOKEN).max(MIN_SYSTEM_PROMPT_TOKENS)
}

/// Ordered turn log for one conversation.
///
/// Owned by a single conversation and mutated from one place; there is no
/// reset, drop it and build a new one instead.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    system_prompt: String,
    window_limit: u64,
    wire_format: WireFormat,
    turns: Vec<Turn>,
    // One entry per assistant turn appended with usage.
    costs: Vec<TokenCost>,
    total_tokens: u64,
}

impl HistoryStore {
    /// Create an empty store.
    ///
    /// Fails with [`HistoryError::Config`] when `window_limit` is zero.
    pub fn new(system_prompt: impl Into<String>, window_limit: u64) -> Result<Self> {
        let system_prompt = system_prompt.into();
        if window_limit == 0 {
            return Err(HistoryError::Config(
                "context window limit must be greater than zero".to_string(),
            ));
        }

        let total_tokens = estimate_system_tokens(&system_prompt);
        debug!(
            window_limit,
            system_tokens = total_tokens,
            "Created conversation history"
        );

        Ok(Self {
            system_prompt,
            window_limit,
            wire_format: WireFormat::default(),
            turns: Vec::new(),
            costs: Vec::new(),
            total_tokens,
        })
    }

    /// Create a store from configuration.
    pub fn from_config(config: &HistoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.system_prompt.clone(), config.context_window_tokens)?
            .with_wire_format(config.wire_format))
    }

    /// Set the wire format used by [`messages`](Self::messages).
    pub fn with_wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }

    /// Append a turn.
    ///
    /// `content` may be a string, a list of blocks in either wire shape, or an
    /// object wrapping such a list under `content`. Usage is recorded only for
    /// assistant turns.
    pub fn append(&mut self, role: Role, content: impl Into<Value>, usage: Option<TokenCost>) {
        let parts = to_canonical(&content.into());
        self.append_parts(role, parts, usage);
    }

    /// Append a turn from canonical parts.
    pub fn append_parts(&mut self, role: Role, parts: Vec<ContentPart>, usage: Option<TokenCost>) {
        debug!(role = %role, parts = parts.len(), "Appending turn");
        self.turns.push(Turn::new(role, parts));

        if let (Role::Assistant, Some(cost)) = (role, usage) {
            self.costs.push(cost);
            self.total_tokens = self.total_tokens.saturating_add(cost.total());
            debug!(
                input_tokens = cost.input_tokens,
                output_tokens = cost.output_tokens,
                total_tokens = self.total_tokens,
                "Recorded turn usage"
            );
        }
    }

    /// Remove the newest turn if it is a user turn still waiting for a reply.
    ///
    /// User turns are never priced, so the token total is unchanged.
    pub fn discard_unanswered(&mut self) -> Option<Turn> {
        match self.turns.last() {
            Some(turn) if turn.role == Role::User => {
                debug!("Discarding unanswered user turn");
                self.turns.pop()
            }
            _ => None,
        }
    }

    /// Evict the oldest user/assistant pairs until the total fits the window.
    ///
    /// A user turn directly followed by another user turn never got a reply;
    /// it is dropped from the head without touching the accounting.
    ///
    /// Stops early, leaving the store over the limit, when no cost records
    /// remain, fewer than two turns remain, or the oldest turn is an
    /// assistant turn.
    pub fn enforce_limit(&mut self) {
        if self.total_tokens <= self.window_limit {
            return;
        }

        let before = self.total_tokens;
        let mut evicted = 0usize;

        while !self.costs.is_empty()
            && self.turns.len() >= 2
            && self.total_tokens > self.window_limit
        {
            if self.head_is_orphaned_user() {
                // A user turn that never got a reply carries no cost.
                self.turns.remove(0);
                debug!("Dropped unanswered user turn at the head of the history");
                continue;
            }

            if !self.head_is_pair() {
                warn!(
                    first = %self.turns[0].role,
                    second = %self.turns[1].role,
                    "Oldest turns are not a user/assistant pair, stopping eviction"
                );
                break;
            }

            self.turns.drain(..2);
            let dropped = self.costs.remove(0);
            self.total_tokens = self.total_tokens.saturating_sub(dropped.total());
            evicted += 1;

            if !self.turns.is_empty() && !self.costs.is_empty() {
                self.pin_truncation_notice();
            }
        }

        if evicted > 0 {
            info!(
                pairs = evicted,
                before,
                after = self.total_tokens,
                limit = self.window_limit,
                "Truncated conversation history"
            );
        }

        if self.total_tokens > self.window_limit {
            warn!(
                total_tokens = self.total_tokens,
                limit = self.window_limit,
                turns = self.turns.len(),
                "History still exceeds the context window after eviction"
            );
        }
    }

    fn head_is_orphaned_user(&self) -> bool {
        self.turns[0].role == Role::User && self.turns[1].role == Role::User
    }

    fn head_is_pair(&self) -> bool {
        self.turns[0].role == Role::User && self.turns[1].role == Role::Assistant
    }

    // Replace the oldest turn with the notice and re-price its cost entry.
    fn pin_truncation_notice(&mut self) {
        self.turns[0] = Turn::user(TRUNCATION_NOTICE);

        let original_input = self.costs[0].input_tokens;
        self.costs[0].input_tokens = TRUNCATION_NOTICE_TOKENS;
        self.total_tokens = self
            .total_tokens
            .saturating_add(TRUNCATION_NOTICE_TOKENS)
            .saturating_sub(original_input);
    }

    /// Serialize every turn into the given wire shape.
    pub fn serialize(&self, format: WireFormat) -> Vec<WireTurn> {
        debug!(format = %format, turns = self.turns.len(), "Serializing history");
        serialize_turns(&self.turns, format)
    }

    /// Serialize every turn into the configured wire shape.
    pub fn messages(&self) -> Vec<WireTurn> {
        self.serialize(self.wire_format)
    }

    /// Copy of the current turns.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.clone()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Cost records, oldest first.
    pub fn costs(&self) -> &[TokenCost] {
        &self.costs
    }

    /// Estimated tokens the next request will consume.
    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }

    pub fn window_limit(&self) -> u64 {
        self.window_limit
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
