//! `POST /stream` (§6): accepts a query, starts the agent engine, and
//! streams the resulting SSE frames back to the caller.

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, StreamExt};
use scholarly_config::{RequestConfig, RequestConfigOverrides};
use scholarly_events::sse;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamRequest {
    pub query: String,
    pub session_id: Option<String>,
    #[serde(flatten)]
    pub overrides: RequestConfigOverrides,
}

pub async fn stream(
    State(state): State<AppState>,
    Json(body): Json<StreamRequest>,
) -> Result<Response, ApiError> {
    let mut config = RequestConfig::default().with_overrides(body.overrides)?;
    if config.provider.is_none() {
        config.provider = Some(state.config.default_provider.clone());
    }
    if config.model.is_none() {
        if let Some(provider) = &config.provider {
            config.model = state.config.default_models.get(provider).cloned();
        }
    }

    let (rx, _summary) = state
        .agent
        .ask(scholarly_agent::AskRequest {
            query: body.query,
            session_id: body.session_id,
            config,
        })
        .await?;

    let frames = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((Ok::<_, std::io::Error>(sse::encode(&event)), rx))
    });

    let body = Body::from_stream(frames.map(|frame| frame.map(axum::body::Bytes::from)));

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()))
}
