//! Out-of-scope node (§4.E).

use async_trait::async_trait;
use futures::StreamExt;
use scholarly_config::OUT_OF_SCOPE_TEMPERATURE;
use scholarly_core::error::Result;
use scholarly_events::{Event, Step};
use scholarly_prompt::{compose, SystemTemplate};
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::llm::GENERATION_MAX_TOKENS;
use crate::state::{AgentState, RunStatus};

use super::GraphNode;

pub struct OutOfScopeNode;

#[async_trait]
impl GraphNode for OutOfScopeNode {
    async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "out_of_scope", request_id = %ctx.request_id);
        async move {
            ctx.events
                .send(Event::status(Step::OutOfScope, "query is out of scope"))
                .await?;

            let (system, user) = compose(
                SystemTemplate::OutOfScope,
                &state.conversation_history,
                &[],
                &state.current_query,
                None,
                None,
            );
            let messages = vec![scholarly_core::types::Message::user(format!("{system}\n\n{user}"))];

            let provider = ctx.providers.resolve(ctx.provider_name())?;
            let stream_result = provider
                .stream(
                    &messages,
                    ctx.model_name(),
                    OUT_OF_SCOPE_TEMPERATURE,
                    GENERATION_MAX_TOKENS,
                )
                .await;

            let mut stream = match stream_result {
                Ok(stream) => stream,
                Err(e) => {
                    ctx.events
                        .send(Event::Error {
                            error: e.to_string(),
                            code: Some(e.code().to_string()),
                        })
                        .await
                        .ok();
                    state.status = Some(RunStatus::Failed);
                    return Ok(state);
                }
            };

            let mut answer = String::new();
            loop {
                match stream.next().await {
                    Some(Ok(token)) => {
                        answer.push_str(&token);
                        ctx.events.send(Event::Content { token }).await?;
                    }
                    Some(Err(e)) => {
                        ctx.events
                            .send(Event::Error {
                                error: e.to_string(),
                                code: Some(e.code().to_string()),
                            })
                            .await
                            .ok();
                        state.status = Some(RunStatus::Failed);
                        return Ok(state);
                    }
                    None => break,
                }
            }

            state.final_answer = Some(answer);
            state.status = Some(RunStatus::OutOfScope);
            Ok(state)
        }
        .instrument(span)
        .await
    }
}
