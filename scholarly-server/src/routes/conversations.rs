//! `GET /conversations`, `GET /conversations/{session_id}`,
//! `DELETE /conversations/{session_id}` (§6).

use axum::extract::{Path, Query, State};
use axum::Json;
use scholarly_core::error::Error;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub session_id_prefix: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
    pub conversations: Vec<scholarly_core::types::ConversationSummary>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let (conversations, total) = state
        .store
        .list_sessions(query.offset, query.limit, query.session_id_prefix.as_deref())
        .await?;
    Ok(Json(ListResponse {
        total,
        offset: query.offset,
        limit: query.limit,
        conversations,
    }))
}

#[derive(Debug, Serialize)]
pub struct GetResponse {
    pub session_id: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub turns: Vec<scholarly_core::types::ConversationTurn>,
}

pub async fn get(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<GetResponse>, ApiError> {
    let conversation = state
        .store
        .get_conversation(&session_id)
        .await?
        .ok_or_else(|| Error::NotFound(session_id.clone()))?;
    // No pagination on turn history in this endpoint (§6); cap generously
    // rather than pass an unbounded limit through to the SQL `LIMIT` clause.
    let turns = state.store.get_history(&session_id, 10_000).await?;
    Ok(Json(GetResponse {
        session_id: conversation.session_id,
        created_at: conversation.created_at,
        updated_at: conversation.updated_at,
        turns,
    }))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub session_id: String,
    pub turns_deleted: usize,
}

pub async fn delete(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let turns_deleted = state.store.delete(&session_id).await?;
    Ok(Json(DeleteResponse {
        session_id,
        turns_deleted,
    }))
}
