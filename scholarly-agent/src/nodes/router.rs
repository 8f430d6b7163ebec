//! Router node (§4.E).

use async_trait::async_trait;
use scholarly_core::error::Result;
use scholarly_events::{Event, Step};
use scholarly_prompt::SystemTemplate;
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::llm::{compose_messages, structured_call};
use crate::schemas::{router_schema, RouterOutput};
use crate::state::{AgentState, RouterDecision};

use super::GraphNode;

fn tool_enumeration(ctx: &ExecutionContext) -> String {
    let mut names = ctx.tools.names();
    names.sort();
    names
        .iter()
        .filter_map(|name| ctx.tools.get(name))
        .map(|tool| {
            format!(
                "- {} ({:?}): {}\n  parameters: {}",
                tool.name(),
                tool.category(),
                tool.description(),
                tool.schema().parameters
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn tool_history_summary(state: &AgentState) -> String {
    if state.tool_history.is_empty() {
        return "No tools have been called yet.".to_string();
    }
    state
        .tool_history
        .iter()
        .map(|entry| {
            format!(
                "- {} (success={}){}",
                entry.tool_name,
                entry.success,
                entry
                    .error
                    .as_deref()
                    .map(|e| format!(": {e}"))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct RouterNode;

#[async_trait]
impl GraphNode for RouterNode {
    async fn run(&self, state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "routing", request_id = %ctx.request_id);
        async move {
            ctx.events
                .send(Event::status(Step::Routing, "deciding next action"))
                .await?;

            let provider = ctx.providers.resolve(ctx.provider_name())?;
            let remaining_iterations = ctx.config.max_iterations.saturating_sub(state.iteration);
            let user = format!(
                "Available tools:\n{}\n\nTool call history:\n{}\n\nRemaining iterations: {}\n\nQuery: {}",
                tool_enumeration(ctx),
                tool_history_summary(&state),
                remaining_iterations,
                state.current_query,
            );
            let messages =
                compose_messages(SystemTemplate::Router.text(), &state.conversation_history, &user);

            let decision = match structured_call::<RouterOutput>(
                provider.as_ref(),
                &messages,
                ctx.model_name(),
                ctx.config.temperature,
                &router_schema(),
            )
            .await
            {
                Ok(out) => RouterDecision {
                    next_tool: out.next_tool,
                    tool_args: out.tool_args,
                    rationale: out.rationale,
                    should_generate: out.should_generate,
                },
                Err(e) => {
                    let mut state = state;
                    state
                        .reasoning_steps
                        .push(format!("router call failed, forcing generation: {e}"));
                    return finish(state, ctx, RouterDecision {
                        next_tool: None,
                        tool_args: None,
                        rationale: "fallback: router call failed".to_string(),
                        should_generate: true,
                    })
                    .await;
                }
            };
            finish(state, ctx, decision).await
        }
        .instrument(span)
        .await
    }
}

async fn finish(
    mut state: AgentState,
    ctx: &ExecutionContext,
    decision: RouterDecision,
) -> Result<AgentState> {
    state.reasoning_steps.push(decision.rationale.clone());
    state.router_decision = Some(decision);
    ctx.events
        .send(Event::status(Step::Routing, "routing decision made"))
        .await?;
    Ok(state)
}
