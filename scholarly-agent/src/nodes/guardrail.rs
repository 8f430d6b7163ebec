//! Guardrail node (§4.E).

use async_trait::async_trait;
use scholarly_core::error::Result;
use scholarly_events::{Event, Step};
use scholarly_prompt::{compose, SystemTemplate};
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::llm::{compose_messages, structured_call};
use crate::schemas::{guardrail_schema, GuardrailOutput};
use crate::state::{AgentState, GuardrailResult};

use super::GraphNode;

pub struct GuardrailNode;

#[async_trait]
impl GraphNode for GuardrailNode {
    async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "guardrail", request_id = %ctx.request_id);
        async move {
            ctx.events
                .send(Event::status(Step::Guardrail, "checking query scope"))
                .await?;

            let provider = ctx.providers.resolve(ctx.provider_name())?;
            let (system, user) = compose(
                SystemTemplate::Guardrail,
                &[],
                &[],
                &state.current_query,
                None,
                None,
            );
            let messages = compose_messages(&system, &state.conversation_history, &user);

            let result = match structured_call::<GuardrailOutput>(
                provider.as_ref(),
                &messages,
                ctx.model_name(),
                ctx.config.temperature,
                &guardrail_schema(),
            )
            .await
            {
                Ok(out) => GuardrailResult {
                    score: out.score,
                    reasoning: out.reasoning,
                    in_scope: out.score >= ctx.config.guardrail_threshold,
                },
                Err(e) => {
                    state
                        .reasoning_steps
                        .push(format!("guardrail call failed, defaulting in-scope: {e}"));
                    GuardrailResult {
                        score: 0,
                        reasoning: "fallback: guardrail call failed".to_string(),
                        in_scope: true,
                    }
                }
            };
            state.guardrail_result = Some(result);

            ctx.events
                .send(Event::status(Step::Guardrail, "scope check complete"))
                .await?;
            Ok(state)
        }
        .instrument(span)
        .await
    }
}
