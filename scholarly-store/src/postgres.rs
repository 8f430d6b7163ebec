//! Postgres-backed `ConversationStore`.
//!
//! Grounded on the teacher's `llmspell-storage` Postgres backend tests
//! (`tokio-postgres` + `deadpool-postgres`, migrations applied once at
//! startup via `refinery`) and `llmspell-state-persistence/src/manager.rs`'s
//! manager-over-backend shape, adapted from a generic key/value backend to
//! a relational schema with the `(conversation_id, turn_number)` uniqueness
//! invariant §4.C requires.

use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::{Config as PoolConfig, Pool, Runtime};
use scholarly_core::error::{Error, Result};
use scholarly_core::types::{
    Conversation, ConversationSummary, ConversationTurn, SourceRecord, TurnData,
};
use tokio_postgres::{NoTls, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::traits::ConversationStore;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// A `deadpool-postgres`-pooled `ConversationStore`. A connection is
/// checked out only for the duration of a single operation and released
/// before returning (§5: "No request holds a database transaction across
/// an LLM call").
pub struct PostgresConversationStore {
    pool: Pool,
}

impl PostgresConversationStore {
    /// Build a pool from a `postgres://` URL and run pending migrations.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let mut cfg = PoolConfig::new();
        cfg.url = Some(database_url.to_string());
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| Error::Store(format!("failed to create pool: {e}")))?;

        {
            let mut client = pool
                .get()
                .await
                .map_err(|e| Error::Store(format!("failed to acquire connection: {e}")))?;
            embedded::migrations::runner()
                .run_async(&mut **client)
                .await
                .map_err(|e| Error::Store(format!("migration failed: {e}")))?;
        }

        Ok(Self { pool })
    }

    fn row_to_conversation(row: &Row) -> Conversation {
        Conversation {
            id: row.get("id"),
            session_id: row.get("session_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            metadata: row.get("metadata"),
        }
    }

    fn row_to_turn(row: &Row) -> Result<ConversationTurn> {
        let sources: Option<serde_json::Value> = row.get("sources");
        let sources: Option<Vec<SourceRecord>> = sources
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::Store(format!("corrupt sources column: {e}")))?;
        let reasoning_steps: Option<serde_json::Value> = row.get("reasoning_steps");
        let reasoning_steps: Option<Vec<String>> = reasoning_steps
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::Store(format!("corrupt reasoning_steps column: {e}")))?;

        Ok(ConversationTurn {
            id: row.get("id"),
            conversation_id: row.get("conversation_id"),
            turn_number: row.get("turn_number"),
            user_query: row.get("user_query"),
            agent_response: row.get("agent_response"),
            provider: row.get("provider"),
            model: row.get("model"),
            guardrail_score: row.get("guardrail_score"),
            retrieval_attempts: row.get("retrieval_attempts"),
            rewritten_query: row.get("rewritten_query"),
            sources,
            reasoning_steps,
            created_at: row.get("created_at"),
        })
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    #[instrument(skip(self))]
    async fn get_or_create(&self, session_id: &str) -> Result<Conversation> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        if let Some(row) = client
            .query_opt(
                "SELECT id, session_id, created_at, updated_at, metadata FROM conversations WHERE session_id = $1",
                &[&session_id],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?
        {
            return Ok(Self::row_to_conversation(&row));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let row = client
            .query_one(
                "INSERT INTO conversations (id, session_id, created_at, updated_at)
                 VALUES ($1, $2, $3, $3)
                 ON CONFLICT (session_id) DO UPDATE SET session_id = EXCLUDED.session_id
                 RETURNING id, session_id, created_at, updated_at, metadata",
                &[&id, &session_id, &now],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        debug!(session_id, "created conversation");
        Ok(Self::row_to_conversation(&row))
    }

    #[instrument(skip(self))]
    async fn get_conversation(&self, session_id: &str) -> Result<Option<Conversation>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let row = client
            .query_opt(
                "SELECT id, session_id, created_at, updated_at, metadata FROM conversations WHERE session_id = $1",
                &[&session_id],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(row.as_ref().map(Self::row_to_conversation))
    }

    #[instrument(skip(self))]
    async fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let rows = client
            .query(
                "SELECT t.id, t.conversation_id, t.turn_number, t.user_query, t.agent_response,
                        t.provider, t.model, t.guardrail_score, t.retrieval_attempts,
                        t.rewritten_query, t.sources, t.reasoning_steps, t.created_at
                 FROM conversation_turns t
                 JOIN conversations c ON c.id = t.conversation_id
                 WHERE c.session_id = $1
                 ORDER BY t.turn_number DESC
                 LIMIT $2",
                &[&session_id, &(limit as i64)],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let mut turns = rows
            .iter()
            .map(Self::row_to_turn)
            .collect::<Result<Vec<_>>>()?;
        turns.reverse(); // chronological, oldest first (§4.C)
        Ok(turns)
    }

    #[instrument(skip(self, turn))]
    async fn save_turn(&self, session_id: &str, turn: TurnData) -> Result<ConversationTurn> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        let tx = client
            .transaction()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        // Row-level lock on the conversation row serializes concurrent
        // save_turn calls for the same session (§4.C, §8 property 1).
        let conversation_row = tx
            .query_opt(
                "SELECT id FROM conversations WHERE session_id = $1 FOR UPDATE",
                &[&session_id],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;
        let conversation_id: Uuid = conversation_row.get("id");

        let next_turn_number: i32 = tx
            .query_one(
                "SELECT COALESCE(MAX(turn_number) + 1, 0) AS next FROM conversation_turns WHERE conversation_id = $1",
                &[&conversation_id],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .get("next");

        let id = Uuid::new_v4();
        let now = Utc::now();
        let sources_json = turn
            .sources
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::Store(e.to_string()))?;
        let reasoning_json = turn
            .reasoning_steps
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::Store(e.to_string()))?;

        let row = tx
            .query_one(
                "INSERT INTO conversation_turns
                    (id, conversation_id, turn_number, user_query, agent_response, provider,
                     model, guardrail_score, retrieval_attempts, rewritten_query, sources,
                     reasoning_steps, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                 RETURNING id, conversation_id, turn_number, user_query, agent_response, provider,
                           model, guardrail_score, retrieval_attempts, rewritten_query, sources,
                           reasoning_steps, created_at",
                &[
                    &id,
                    &conversation_id,
                    &next_turn_number,
                    &turn.user_query,
                    &turn.agent_response,
                    &turn.provider,
                    &turn.model,
                    &turn.guardrail_score,
                    &(turn.retrieval_attempts as i32),
                    &turn.rewritten_query,
                    &sources_json,
                    &reasoning_json,
                    &now,
                ],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        tx.execute(
            "UPDATE conversations SET updated_at = $2 WHERE id = $1",
            &[&conversation_id, &now],
        )
        .await
        .map_err(|e| Error::Store(e.to_string()))?;

        tx.commit().await.map_err(|e| Error::Store(e.to_string()))?;

        Self::row_to_turn(&row)
    }

    #[instrument(skip(self))]
    async fn list_sessions(
        &self,
        offset: usize,
        limit: usize,
        prefix: Option<&str>,
    ) -> Result<(Vec<ConversationSummary>, usize)> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let like_pattern = prefix.map(|p| format!("{p}%"));

        let total: i64 = match &like_pattern {
            Some(pattern) => client
                .query_one(
                    "SELECT COUNT(*) AS n FROM conversations WHERE session_id LIKE $1",
                    &[pattern],
                )
                .await
                .map_err(|e| Error::Store(e.to_string()))?
                .get("n"),
            None => client
                .query_one("SELECT COUNT(*) AS n FROM conversations", &[])
                .await
                .map_err(|e| Error::Store(e.to_string()))?
                .get("n"),
        };

        let rows = match &like_pattern {
            Some(pattern) => {
                client
                    .query(
                        "SELECT c.session_id, c.created_at, c.updated_at,
                                COUNT(t.id) AS turn_count,
                                (SELECT user_query FROM conversation_turns
                                 WHERE conversation_id = c.id
                                 ORDER BY turn_number DESC LIMIT 1) AS last_query
                         FROM conversations c
                         LEFT JOIN conversation_turns t ON t.conversation_id = c.id
                         WHERE c.session_id LIKE $1
                         GROUP BY c.id
                         ORDER BY c.updated_at DESC
                         OFFSET $2 LIMIT $3",
                        &[pattern, &(offset as i64), &(limit as i64)],
                    )
                    .await
            }
            None => {
                client
                    .query(
                        "SELECT c.session_id, c.created_at, c.updated_at,
                                COUNT(t.id) AS turn_count,
                                (SELECT user_query FROM conversation_turns
                                 WHERE conversation_id = c.id
                                 ORDER BY turn_number DESC LIMIT 1) AS last_query
                         FROM conversations c
                         LEFT JOIN conversation_turns t ON t.conversation_id = c.id
                         GROUP BY c.id
                         ORDER BY c.updated_at DESC
                         OFFSET $1 LIMIT $2",
                        &[&(offset as i64), &(limit as i64)],
                    )
                    .await
            }
        }
        .map_err(|e| Error::Store(e.to_string()))?;

        let items = rows
            .iter()
            .map(|row| ConversationSummary {
                session_id: row.get("session_id"),
                turn_count: row.get("turn_count"),
                last_query: row.get("last_query"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
            .collect();

        Ok((items, total as usize))
    }

    #[instrument(skip(self))]
    async fn delete(&self, session_id: &str) -> Result<usize> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let Some(row) = client
            .query_opt(
                "SELECT id FROM conversations WHERE session_id = $1",
                &[&session_id],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?
        else {
            return Ok(0);
        };
        let conversation_id: Uuid = row.get("id");

        let turn_count: i64 = client
            .query_one(
                "SELECT COUNT(*) AS n FROM conversation_turns WHERE conversation_id = $1",
                &[&conversation_id],
            )
            .await
            .map_err(|e| Error::Store(e.to_string()))?
            .get("n");

        client
            .execute("DELETE FROM conversations WHERE id = $1", &[&conversation_id])
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        Ok(turn_count as usize)
    }

    async fn health_check(&self) -> Result<()> {
        let client = self
            .pool
            .get()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        Ok(())
    }
}
