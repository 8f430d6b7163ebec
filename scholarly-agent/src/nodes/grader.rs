//! Grader node (§4.E).

use async_trait::async_trait;
use scholarly_core::error::Result;
use scholarly_events::{Event, Step};
use scholarly_prompt::SystemTemplate;
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::llm::{compose_messages, structured_call};
use crate::schemas::{grader_schema, GraderOutput};
use crate::state::AgentState;

use super::GraphNode;

pub struct GraderNode;

#[async_trait]
impl GraphNode for GraderNode {
    async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "grading", request_id = %ctx.request_id);
        async move {
            ctx.events
                .send(Event::status(Step::Grading, "grading retrieved chunks"))
                .await?;

            // The grader only ever runs after a `retrieve_chunks` call
            // succeeded (§4.F Executor -> Grader), so reaching here is
            // exactly one retrieval attempt (GLOSSARY: "one invocation of
            // `retrieve_chunks` that reached the grader").
            state.retrieval_attempts += 1;

            let ungraded: Vec<usize> = state
                .relevant_chunks
                .iter()
                .enumerate()
                .filter(|(_, c)| c.was_graded_relevant.is_none())
                .map(|(i, _)| i)
                .collect();

            if ungraded.is_empty() {
                ctx.events
                    .send(Event::status(Step::Grading, "no new chunks to grade"))
                    .await?;
                return Ok(state);
            }

            let provider = ctx.providers.resolve(ctx.provider_name())?;
            let batch = ungraded
                .iter()
                .map(|&i| {
                    format!(
                        "[{}] {}\n{}",
                        state.relevant_chunks[i].arxiv_id,
                        state.relevant_chunks[i].title,
                        state.relevant_chunks[i].text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            let user = format!(
                "Query: {}\n\nCandidate passages (grade each, in order):\n\n{batch}",
                state.current_query
            );
            let messages = compose_messages(SystemTemplate::Grader.text(), &[], &user);

            match structured_call::<GraderOutput>(
                provider.as_ref(),
                &messages,
                ctx.model_name(),
                ctx.config.temperature,
                &grader_schema(),
            )
            .await
            {
                Ok(out) => {
                    for (&idx, grade) in ungraded.iter().zip(out.results.iter()) {
                        state.relevant_chunks[idx].was_graded_relevant = Some(grade.relevant);
                    }
                    // A provider returning fewer verdicts than chunks leaves
                    // the remainder ungraded; the fallback below still
                    // applies to any chunk the loop above didn't reach.
                    for &idx in ungraded.iter().skip(out.results.len()) {
                        state.relevant_chunks[idx].was_graded_relevant = Some(true);
                    }
                }
                Err(e) => {
                    state
                        .reasoning_steps
                        .push(format!("grader call failed, accepting all chunks: {e}"));
                    for &idx in &ungraded {
                        state.relevant_chunks[idx].was_graded_relevant = Some(true);
                    }
                }
            }

            ctx.events
                .send(Event::status(Step::Grading, "grading complete"))
                .await?;
            Ok(state)
        }
        .instrument(span)
        .await
    }
}
