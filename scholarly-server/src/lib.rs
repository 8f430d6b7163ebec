//! ABOUTME: Thin HTTP/SSE surface over the agent engine (§6 External interfaces)
//! ABOUTME: Grounded on the teacher's llmspell-web axum stack; routing and health only, no business logic

pub mod cli;
pub mod embedder;
pub mod error;
pub mod routes;
pub mod state;
