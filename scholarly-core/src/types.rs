//! Shared domain and wire types used across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A research paper in the knowledge base (§3 Paper).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub pdf_url: Option<String>,
    pub raw_text: Option<String>,
    pub sections: Vec<PaperSection>,
}

/// One named section of a paper's body text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperSection {
    pub name: String,
    pub page: Option<u32>,
    pub text: String,
}

/// A retrievable fragment of a paper (§3 Chunk).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub paper_ref: Uuid,
    pub arxiv_id: String,
    pub chunk_index: u32,
    pub text: String,
    pub section_name: Option<String>,
    pub page_number: Option<u32>,
    pub word_count: u32,
    pub embedding: Vec<f32>,
    /// Tokenized representation used by the lexical branch of hybrid search.
    pub lexical_index: Vec<String>,
}

/// Role of a message in a conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a flattened conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A source citation surfaced to the caller (§3 ConversationTurn.sources,
/// §6 `sources` event).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pdf_url: Option<String>,
    pub relevance_score: f32,
    pub published_date: Option<DateTime<Utc>>,
    pub was_graded_relevant: Option<bool>,
}

/// A session thread (§3 Conversation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub metadata: Option<serde_json::Value>,
}

/// One persisted user/assistant exchange (§3 ConversationTurn).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub turn_number: i32,
    pub user_query: String,
    pub agent_response: String,
    pub provider: String,
    pub model: String,
    pub guardrail_score: Option<i32>,
    pub retrieval_attempts: i32,
    pub rewritten_query: Option<String>,
    pub sources: Option<Vec<SourceRecord>>,
    pub reasoning_steps: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Input to `ConversationStore::save_turn` — everything known about a turn
/// before the store assigns its `turn_number`.
#[derive(Debug, Clone)]
pub struct TurnData {
    pub user_query: String,
    pub agent_response: String,
    pub provider: String,
    pub model: String,
    pub guardrail_score: Option<i32>,
    pub retrieval_attempts: i32,
    pub rewritten_query: Option<String>,
    pub sources: Option<Vec<SourceRecord>>,
    pub reasoning_steps: Option<Vec<String>>,
}

/// Summary row for `list_sessions` (§4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub session_id: String,
    pub turn_count: i64,
    pub last_query: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request-scoped correlation id, threaded through tracing spans and into
/// `Event::Error.code` for log correlation.
pub type RequestId = Uuid;
