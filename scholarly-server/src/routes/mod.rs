//! HTTP route handlers (§6). Each module is one endpoint group; handlers
//! translate requests/responses only, no business logic.

pub mod conversations;
pub mod health;
pub mod stream;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stream", post(stream::stream))
        .route("/conversations", get(conversations::list))
        .route(
            "/conversations/:session_id",
            get(conversations::get).delete(conversations::delete),
        )
        .route("/health", get(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
