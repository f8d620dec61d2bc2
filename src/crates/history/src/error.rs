//! Error types for the history store.

use thiserror::Error;

/// Result type for history operations.
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors raised by the history store.
///
/// Content normalization and eviction never fail; the only fallible
/// operation is construction from an unusable configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    /// Invalid configuration supplied at construction.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown wire format name.
    #[error("Unknown wire format: {0}")]
    UnknownWireFormat(String),
}
