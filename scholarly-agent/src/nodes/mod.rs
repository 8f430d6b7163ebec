//! Graph nodes (§4.E): pure `(state, context) -> state'` transformations
//! that additionally emit events.

mod executor;
mod generator;
mod grader;
mod guardrail;
mod out_of_scope;
mod rewriter;
mod router;

pub use executor::ExecutorNode;
pub use generator::GeneratorNode;
pub use grader::GraderNode;
pub use guardrail::GuardrailNode;
pub use out_of_scope::OutOfScopeNode;
pub use rewriter::RewriterNode;
pub use router::RouterNode;

use async_trait::async_trait;
use scholarly_core::error::Result;

use crate::context::ExecutionContext;
use crate::state::AgentState;

/// One node in the execution graph (§4.E, GLOSSARY "Node"). Implementors
/// take ownership of the state, transform it, and return the next state;
/// side effects are limited to LLM/tool calls and event emission.
#[async_trait]
pub trait GraphNode: Send + Sync {
    async fn run(&self, state: AgentState, ctx: &ExecutionContext) -> Result<AgentState>;
}
