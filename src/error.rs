//! Error types for Triloop
//!
//! Library code returns `TriloopError`; the binary wraps it in `eyre` reports.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriloopError {
    /// Durable state could not be written, or the state owner is gone
    #[error("Storage error: {0}")]
    Storage(String),

    /// Model call failed or the turn budget ran out
    #[error("LLM error: {0}")]
    Llm(String),

    /// A role template failed to compile or render
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A role loop task panicked or was cancelled
    #[error("{role} loop aborted: {message}")]
    LoopAborted { role: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TriloopError>;
