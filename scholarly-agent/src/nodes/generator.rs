//! Generator node (§4.E).

use async_trait::async_trait;
use futures::StreamExt;
use scholarly_core::error::Result;
use scholarly_core::types::SourceRecord;
use scholarly_events::{Event, Step};
use scholarly_prompt::{compose, ContextChunk, SystemTemplate};
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::llm::GENERATION_MAX_TOKENS;
use crate::state::{AgentState, RunStatus};

use super::GraphNode;

pub struct GeneratorNode;

#[async_trait]
impl GraphNode for GeneratorNode {
    async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "generation", request_id = %ctx.request_id);
        async move {
            ctx.events
                .send(Event::status(Step::Generation, "composing answer"))
                .await?;

            let top_k = ctx.config.top_k;
            let selected: Vec<_> = state.relevant_chunks.iter().take(top_k).cloned().collect();
            let context_chunks: Vec<ContextChunk> = selected
                .iter()
                .map(|c| ContextChunk {
                    arxiv_id: c.arxiv_id.clone(),
                    title: c.title.clone(),
                    text: c.text.clone(),
                })
                .collect();

            let note = if state.retrieval_attempts == ctx.config.max_retrieval_attempts
                && state.relevant_chunks.len() < top_k
            {
                Some("Limited sources found")
            } else {
                None
            };

            let (system, user) = compose(
                SystemTemplate::Answer,
                &state.conversation_history,
                &context_chunks,
                &state.current_query,
                None,
                note,
            );
            let messages = vec![scholarly_core::types::Message::user(format!("{system}\n\n{user}"))];

            state.sources = selected
                .iter()
                .map(|c| SourceRecord {
                    arxiv_id: c.arxiv_id.clone(),
                    title: c.title.clone(),
                    authors: c.authors.clone(),
                    pdf_url: None,
                    relevance_score: c.score,
                    published_date: c.published_date,
                    was_graded_relevant: c.was_graded_relevant,
                })
                .collect();

            let provider = ctx.providers.resolve(ctx.provider_name())?;
            let stream_result = provider
                .stream(&messages, ctx.model_name(), ctx.config.temperature, GENERATION_MAX_TOKENS)
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

            ctx.events
                .send(Event::Sources {
                    sources: state.sources.clone(),
                })
                .await?;

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
            state.status = Some(RunStatus::Generated);
            Ok(state)
        }
        .instrument(span)
        .await
    }
}
