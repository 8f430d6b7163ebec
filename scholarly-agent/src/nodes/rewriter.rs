//! Rewriter node (§4.E).

use async_trait::async_trait;
use scholarly_core::error::Result;
use scholarly_events::{Event, Step};
use scholarly_prompt::SystemTemplate;
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::llm::{compose_messages, structured_call};
use crate::schemas::{rewriter_schema, RewriterOutput};
use crate::state::AgentState;

use super::GraphNode;

pub struct RewriterNode;

#[async_trait]
impl GraphNode for RewriterNode {
    async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "rewriting", request_id = %ctx.request_id);
        async move {
            ctx.events
                .send(Event::status(Step::Routing, "rewriting query for retrieval"))
                .await?;

            let provider = ctx.providers.resolve(ctx.provider_name())?;
            let user = format!("Original query: {}", state.current_query);
            let messages = compose_messages(SystemTemplate::Rewriter.text(), &state.conversation_history, &user);

            match structured_call::<RewriterOutput>(
                provider.as_ref(),
                &messages,
                ctx.model_name(),
                ctx.config.temperature,
                &rewriter_schema(),
            )
            .await
            {
                Ok(out) => {
                    state.reasoning_steps.push(format!(
                        "rewrote query to \"{}\": {}",
                        out.rewritten_query, out.reason
                    ));
                    state.current_query = out.rewritten_query;
                }
                Err(e) => {
                    state
                        .reasoning_steps
                        .push(format!("rewrite call failed, keeping current query: {e}"));
                }
            }

            Ok(state)
        }
        .instrument(span)
        .await
    }
}
