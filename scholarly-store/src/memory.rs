//! An in-process `ConversationStore` double, for tests that cannot reach a
//! real Postgres instance. Mirrors the shape of `scholarly-search`'s
//! `InMemorySearchIndex` and `scholarly-providers`'s `FakeProvider`: same
//! trait, deterministic in-memory state, no I/O.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use scholarly_core::error::{Error, Result};
use scholarly_core::types::{
    Conversation, ConversationSummary, ConversationTurn, TurnData,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::traits::ConversationStore;

struct SessionState {
    conversation: Conversation,
    turns: Vec<ConversationTurn>,
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl InMemoryConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_or_create(&self, session_id: &str) -> Result<Conversation> {
        let mut sessions = self.sessions.lock();
        if let Some(state) = sessions.get(session_id) {
            return Ok(state.conversation.clone());
        }
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            created_at: now,
            updated_at: now,
            metadata: None,
        };
        sessions.insert(
            session_id.to_string(),
            SessionState {
                conversation: conversation.clone(),
                turns: Vec::new(),
            },
        );
        Ok(conversation)
    }

    async fn get_conversation(&self, session_id: &str) -> Result<Option<Conversation>> {
        let sessions = self.sessions.lock();
        Ok(sessions.get(session_id).map(|state| state.conversation.clone()))
    }

    async fn get_history(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>> {
        let sessions = self.sessions.lock();
        let Some(state) = sessions.get(session_id) else {
            return Ok(Vec::new());
        };
        let turns = &state.turns;
        let start = turns.len().saturating_sub(limit);
        Ok(turns[start..].to_vec())
    }

    async fn save_turn(&self, session_id: &str, turn: TurnData) -> Result<ConversationTurn> {
        let mut sessions = self.sessions.lock();
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| Error::NotFound(session_id.to_string()))?;

        let turn_number = state.turns.last().map_or(0, |t| t.turn_number + 1);
        let now = Utc::now();
        let saved = ConversationTurn {
            id: Uuid::new_v4(),
            conversation_id: state.conversation.id,
            turn_number,
            user_query: turn.user_query,
            agent_response: turn.agent_response,
            provider: turn.provider,
            model: turn.model,
            guardrail_score: turn.guardrail_score,
            retrieval_attempts: turn.retrieval_attempts,
            rewritten_query: turn.rewritten_query,
            sources: turn.sources,
            reasoning_steps: turn.reasoning_steps,
            created_at: now,
        };
        state.turns.push(saved.clone());
        state.conversation.updated_at = now;
        Ok(saved)
    }

    async fn list_sessions(
        &self,
        offset: usize,
        limit: usize,
        prefix: Option<&str>,
    ) -> Result<(Vec<ConversationSummary>, usize)> {
        let sessions = self.sessions.lock();
        let mut all: Vec<ConversationSummary> = sessions
            .values()
            .filter(|state| prefix.is_none_or(|p| state.conversation.session_id.starts_with(p)))
            .map(|state| ConversationSummary {
                session_id: state.conversation.session_id.clone(),
                turn_count: state.turns.len() as i64,
                last_query: state.turns.last().map(|t| t.user_query.clone()),
                created_at: state.conversation.created_at,
                updated_at: state.conversation.updated_at,
            })
            .collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        let total = all.len();
        let page = all.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }

    async fn delete(&self, session_id: &str) -> Result<usize> {
        let mut sessions = self.sessions.lock();
        Ok(sessions
            .remove(session_id)
            .map_or(0, |state| state.turns.len()))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn turn_numbers_are_dense_and_increasing() {
        let store = InMemoryConversationStore::new();
        store.get_or_create("s1").await.unwrap();
        for i in 0..5 {
            let turn = store
                .save_turn(
                    "s1",
                    TurnData {
                        user_query: format!("q{i}"),
                        agent_response: format!("a{i}"),
                        provider: "fake".into(),
                        model: "fake-model-v1".into(),
                        guardrail_score: Some(90),
                        retrieval_attempts: 1,
                        rewritten_query: None,
                        sources: None,
                        reasoning_steps: None,
                    },
                )
                .await
                .unwrap();
            assert_eq!(turn.turn_number, i);
        }
    }

    #[tokio::test]
    async fn save_turn_on_unknown_session_fails() {
        let store = InMemoryConversationStore::new();
        let err = store
            .save_turn(
                "nope",
                TurnData {
                    user_query: "q".into(),
                    agent_response: "a".into(),
                    provider: "fake".into(),
                    model: "fake-model-v1".into(),
                    guardrail_score: None,
                    retrieval_attempts: 0,
                    rewritten_query: None,
                    sources: None,
                    reasoning_steps: None,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn get_history_respects_limit_and_order() {
        let store = InMemoryConversationStore::new();
        store.get_or_create("s1").await.unwrap();
        for i in 0..3 {
            store
                .save_turn(
                    "s1",
                    TurnData {
                        user_query: format!("q{i}"),
                        agent_response: format!("a{i}"),
                        provider: "fake".into(),
                        model: "fake-model-v1".into(),
                        guardrail_score: None,
                        retrieval_attempts: 0,
                        rewritten_query: None,
                        sources: None,
                        reasoning_steps: None,
                    },
                )
                .await
                .unwrap();
        }
        let history = store.get_history("s1", 2).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].user_query, "q1");
        assert_eq!(history[1].user_query, "q2");
    }

    #[tokio::test]
    async fn delete_returns_turn_count_and_clears_session() {
        let store = InMemoryConversationStore::new();
        store.get_or_create("s1").await.unwrap();
        store
            .save_turn(
                "s1",
                TurnData {
                    user_query: "q".into(),
                    agent_response: "a".into(),
                    provider: "fake".into(),
                    model: "fake-model-v1".into(),
                    guardrail_score: None,
                    retrieval_attempts: 0,
                    rewritten_query: None,
                    sources: None,
                    reasoning_steps: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(store.delete("s1").await.unwrap(), 1);
        assert!(store.get_history("s1", 10).await.unwrap().is_empty());
    }
}
