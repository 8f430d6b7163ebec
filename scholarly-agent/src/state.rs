//! The per-request in-memory state threaded through every graph node
//! (§3 "In-memory core entities (per request)").

use chrono::{DateTime, Utc};
use scholarly_core::types::{Message, SourceRecord};

/// Outcome of the guardrail node.
#[derive(Debug, Clone)]
pub struct GuardrailResult {
    pub score: i32,
    pub reasoning: String,
    pub in_scope: bool,
}

/// Outcome of one router decision (§4.E Router).
#[derive(Debug, Clone)]
pub struct RouterDecision {
    pub next_tool: Option<String>,
    pub tool_args: Option<serde_json::Value>,
    pub rationale: String,
    pub should_generate: bool,
}

/// One record of a tool invocation, kept for router context and for the
/// final `reasoning_steps` summary (§4.E Executor).
#[derive(Debug, Clone)]
pub struct ToolHistoryEntry {
    pub tool_name: String,
    pub args: serde_json::Value,
    pub success: bool,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

/// A chunk retrieved during this request, as surfaced through the
/// `retrieve_chunks` tool's JSON result (§4.B), carrying its current
/// fused score and grading outcome (§4.E Executor/Grader). The agent
/// engine only ever sees chunks through the tool boundary, never through
/// the search index directly (§5: tools mediate all retrieval).
#[derive(Debug, Clone)]
pub struct RelevantChunk {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published_date: Option<DateTime<Utc>>,
    pub chunk_index: u32,
    pub text: String,
    pub section_name: Option<String>,
    pub page_number: Option<u32>,
    pub score: f32,
    pub was_graded_relevant: Option<bool>,
}

/// Terminal classification of a finished or aborted run. Cancellation is
/// not represented here: it surfaces as `Error::Cancelled` propagated out
/// of `ExecutionEngine::run` (§5), which discards the in-progress state
/// rather than returning it, so there is never an `AgentState` left to
/// mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Generated,
    OutOfScope,
    Failed,
}

/// The mutable state a `(state, context) -> state'` node transforms
/// (§3 "In-memory core entities (per request)", §4.E).
#[derive(Debug, Clone)]
pub struct AgentState {
    pub request_id: uuid::Uuid,
    pub original_query: String,
    pub current_query: String,
    pub conversation_history: Vec<Message>,
    pub relevant_chunks: Vec<RelevantChunk>,
    pub tool_history: Vec<ToolHistoryEntry>,
    pub guardrail_result: Option<GuardrailResult>,
    pub router_decision: Option<RouterDecision>,
    pub iteration: u32,
    pub retrieval_attempts: u32,
    pub reasoning_steps: Vec<String>,
    pub final_answer: Option<String>,
    pub sources: Vec<SourceRecord>,
    pub status: Option<RunStatus>,
}

impl AgentState {
    #[must_use]
    pub fn new(request_id: uuid::Uuid, query: String, conversation_history: Vec<Message>) -> Self {
        Self {
            request_id,
            original_query: query.clone(),
            current_query: query,
            conversation_history,
            relevant_chunks: Vec::new(),
            tool_history: Vec::new(),
            guardrail_result: None,
            router_decision: None,
            iteration: 0,
            retrieval_attempts: 0,
            reasoning_steps: Vec::new(),
            final_answer: None,
            sources: Vec::new(),
            status: None,
        }
    }

    /// Merges newly retrieved chunks into `relevant_chunks`: union by
    /// `(arxiv_id, chunk_index)`, keeping the maximum score per key,
    /// ordered by score descending (§4.E Executor).
    pub fn merge_chunks(&mut self, incoming: Vec<RelevantChunk>) {
        for chunk in incoming {
            let key = (chunk.arxiv_id.clone(), chunk.chunk_index);
            if let Some(existing) = self
                .relevant_chunks
                .iter_mut()
                .find(|rc| (rc.arxiv_id.clone(), rc.chunk_index) == key)
            {
                if chunk.score > existing.score {
                    existing.score = chunk.score;
                }
            } else {
                self.relevant_chunks.push(chunk);
            }
        }
        self.relevant_chunks
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// `Some(current_query)` iff the rewriter changed it from
    /// `original_query` (§3 AgentState, §4.I Metadata `rewritten_query`).
    #[must_use]
    pub fn rewritten_query(&self) -> Option<String> {
        if self.current_query == self.original_query {
            None
        } else {
            Some(self.current_query.clone())
        }
    }

    /// Count of chunks graded relevant so far (§4.E Grader).
    #[must_use]
    pub fn graded_relevant_count(&self) -> usize {
        self.relevant_chunks
            .iter()
            .filter(|rc| rc.was_graded_relevant == Some(true))
            .count()
    }
}
