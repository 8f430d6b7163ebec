//! Conversation store contract (§4.C).

use async_trait::async_trait;
use scholarly_core::error::Result;
use scholarly_core::types::{Conversation, ConversationSummary, ConversationTurn, TurnData};

/// Per-session turn log with monotonic turn numbers. All operations are
/// transactional (§4.C); concurrent `save_turn` calls for the same
/// `session_id` are serialized such that `turn_number` remains a dense,
/// strictly increasing prefix (§8 property 1).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Idempotently fetch or create the conversation for `session_id`.
    async fn get_or_create(&self, session_id: &str) -> Result<Conversation>;

    /// Fetch the conversation for `session_id` without creating one,
    /// `None` if unknown. Used by read-only lookups (§6 `GET
    /// /conversations/{session_id}`) that must 404 rather than silently
    /// create a session.
    async fn get_conversation(&self, session_id: &str) -> Result<Option<Conversation>>;

    /// The most recent `limit` turns, oldest first. Empty if the session
    /// is unknown (§4.C).
    async fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>>;

    /// Persist a new turn, assigning `turn_number = max(existing) + 1` or
    /// `0`, and bump `conversations.updated_at` (§4.C).
    async fn save_turn(&self, session_id: &str, turn: TurnData) -> Result<ConversationTurn>;

    /// Paginated session listing (§4.C). `prefix`, when set, restricts the
    /// result to sessions whose `session_id` starts with it — useful for
    /// operational debugging of a single client's sessions.
    async fn list_sessions(
        &self,
        offset: usize,
        limit: usize,
        prefix: Option<&str>,
    ) -> Result<(Vec<ConversationSummary>, usize)>;

    /// Cascade-delete a session and its turns, returning the number of
    /// turns removed.
    async fn delete(&self, session_id: &str) -> Result<usize>;

    /// `SELECT 1`-style liveness check for `/health` (ambient, SPEC_FULL §4.C).
    async fn health_check(&self) -> Result<()>;
}
