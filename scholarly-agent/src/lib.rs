//! ABOUTME: Graph nodes, execution engine, and agent service (§4.E, §4.F, §4.I)
//! ABOUTME: Grounded on llmspell-agents's lifecycle/state_machine.rs and config.rs

pub mod context;
pub mod engine;
pub mod llm;
pub mod nodes;
pub mod schemas;
pub mod service;
pub mod state;

pub use context::ExecutionContext;
pub use engine::ExecutionEngine;
pub use service::{AgentService, AskRequest, AskSummary};
pub use state::AgentState;
