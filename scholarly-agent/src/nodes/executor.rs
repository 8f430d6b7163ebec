//! Executor node (§4.E).

use async_trait::async_trait;
use chrono::Utc;
use scholarly_core::error::Result;
use scholarly_events::{Event, Step};
use serde_json::json;
use tracing::{info_span, Instrument};

use crate::context::ExecutionContext;
use crate::state::{AgentState, RelevantChunk, ToolHistoryEntry};

use super::GraphNode;

fn chunks_from_tool_result(data: &serde_json::Value) -> Vec<RelevantChunk> {
    let Some(chunks) = data.get("chunks").and_then(serde_json::Value::as_array) else {
        return Vec::new();
    };
    chunks
        .iter()
        .filter_map(|c| {
            Some(RelevantChunk {
                arxiv_id: c.get("arxiv_id")?.as_str()?.to_string(),
                title: c
                    .get("title")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                authors: c
                    .get("authors")
                    .and_then(serde_json::Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(serde_json::Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                published_date: c
                    .get("published_date")
                    .and_then(|v| serde_json::from_value(v.clone()).ok()),
                chunk_index: c.get("chunk_index")?.as_u64()? as u32,
                text: c.get("chunk_text")?.as_str()?.to_string(),
                section_name: c
                    .get("section")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string),
                page_number: c.get("page").and_then(serde_json::Value::as_u64).map(|v| v as u32),
                score: c.get("score").and_then(serde_json::Value::as_f64).unwrap_or(0.0) as f32,
                was_graded_relevant: None,
            })
        })
        .collect()
}

pub struct ExecutorNode;

#[async_trait]
impl GraphNode for ExecutorNode {
    async fn run(&self, mut state: AgentState, ctx: &ExecutionContext) -> Result<AgentState> {
        let span = info_span!("node", step = "executing", request_id = %ctx.request_id);
        async move {
            let decision = state
                .router_decision
                .clone()
                .expect("executor only runs after a router decision selecting a tool");
            let args = decision.tool_args.clone().unwrap_or_else(|| json!({}));

            // The router schema makes `next_tool` optional, and the
            // ROUTER -> EXECUTOR transition guards only on `should_generate`
            // / the iteration cap, so a schema-valid decision with no
            // `next_tool` can still land here. Treat it the same as any
            // other tool failure rather than panicking on it.
            let started_at = Utc::now();
            let (tool_name, success, error, data) = match &decision.next_tool {
                Some(name) => match ctx.tools.lookup(name) {
                    Ok(tool) => {
                        if let Err(validation_error) = tool.validate(&args) {
                            (name.clone(), false, Some(validation_error), None)
                        } else {
                            let result = tool.invoke(args.clone()).await;
                            (name.clone(), result.success, result.error, result.data)
                        }
                    }
                    Err(e) => (name.clone(), false, Some(e.to_string()), None),
                },
                None => (
                    "none".to_string(),
                    false,
                    Some("router selected no tool despite should_generate=false".to_string()),
                    None,
                ),
            };
            let ended_at = Utc::now();

            if success && tool_name == "retrieve_chunks" {
                if let Some(data) = &data {
                    state.merge_chunks(chunks_from_tool_result(data));
                }
            }

            if !success {
                state.reasoning_steps.push(format!(
                    "tool {tool_name} failed: {}",
                    error.as_deref().unwrap_or("unknown error")
                ));
            }

            state.tool_history.push(ToolHistoryEntry {
                tool_name: tool_name.clone(),
                args,
                success,
                error,
                started_at,
                ended_at,
            });

            ctx.events
                .send(Event::status_with_details(
                    Step::Executing,
                    format!("executed {tool_name}"),
                    json!({"tool_name": tool_name, "success": success}),
                ))
                .await?;

            Ok(state)
        }
        .instrument(span)
        .await
    }
}
