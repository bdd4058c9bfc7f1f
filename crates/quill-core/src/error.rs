//! Error taxonomy for Quill.
//!
//! Propagation policy:
//! - Tool-level failures never surface as `Err` — tools catch internally and
//!   return a descriptive string result so the model can react to it.
//! - Ingestion failures (`EmptyInput`, `Embedding`, `Persistence`) and raw
//!   model-connection failures (`Provider`) propagate to the caller as
//!   structured results; nothing is swallowed at those boundaries.

use thiserror::Error;

/// Quill result type.
pub type Result<T> = std::result::Result<T, QuillError>;

#[derive(Error, Debug)]
pub enum QuillError {
    /// Empty document or query after trimming. Recoverable, reported to caller.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Embedding provider failure or dimension mismatch.
    /// Recoverable at tool level, fatal at ingestion level.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Generation model failure. Fatal to the current conversation turn.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Vector store failure. Fatal to ingestion; no partial success claimed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Outbound HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Tool execution failure that escaped a tool's own catch-all.
    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
