//! Aggregate error type for the agent engine.
//!
//! Every crate in the workspace defines its own narrow error enum and
//! converts into this one at its boundary, the way the teacher's
//! `LLMSpellError` aggregates substrate errors from each subsystem.

use thiserror::Error;

/// Top-level error for the scholarly agent engine.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("search index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("tool error in {tool}: {message}")]
    Tool { tool: String, message: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("LLM provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    #[error("structured output parse failure: {0}")]
    SchemaParse(String),

    #[error("conversation store error: {0}")]
    Store(String),

    #[error("conversation not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request was cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Short machine-readable code surfaced on `Event::Error.code`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::EmbeddingUnavailable(_) => "embedding_unavailable",
            Self::IndexUnavailable(_) => "index_unavailable",
            Self::Tool { .. } => "tool_error",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Provider { .. } => "provider_error",
            Self::SchemaParse(_) => "schema_parse",
            Self::Store(_) => "store_error",
            Self::NotFound(_) => "not_found",
            Self::Configuration(_) => "configuration",
            Self::Cancelled => "cancelled",
            Self::Internal(_) => "internal",
        }
    }
}
