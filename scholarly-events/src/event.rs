//! The tagged event protocol (§3, §6 "Event payload schemas").

use scholarly_core::types::SourceRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The node a `Status` event reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Guardrail,
    Routing,
    Executing,
    Grading,
    Generation,
    OutOfScope,
}

/// Final run metadata, emitted once per request immediately before `Done`
/// (§4.I step 5-6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub session_id: Option<String>,
    pub turn_number: i32,
    pub execution_time_ms: u64,
    pub retrieval_attempts: i32,
    pub rewritten_query: Option<String>,
    pub guardrail_score: Option<i32>,
    pub provider: String,
    pub model: String,
    pub reasoning_steps: Vec<String>,
    /// Set when `save_turn` failed after a successful generation (§7:
    /// persistence errors). `turn_number` is `-1` in that case.
    pub error: Option<String>,
}

/// One item on the event channel (§3, §4.G). Every event is emitted
/// atomically; there are no partial events.
///
/// `Event` itself derives `Serialize`/`Deserialize` with Rust's default
/// externally-tagged representation for convenience in tests and logs;
/// the wire format used over SSE (§4.H) is produced separately by
/// [`crate::sse::encode`], which emits the `type_name()` as the `event:`
/// line and a flat, untagged payload as `data:`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Status {
        step: Step,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<Value>,
    },
    Content {
        token: String,
    },
    Sources {
        sources: Vec<SourceRecord>,
    },
    Metadata(Metadata),
    Error {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    Done,
}

impl Event {
    #[must_use]
    pub fn status(step: Step, message: impl Into<String>) -> Self {
        Event::Status {
            step,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn status_with_details(step: Step, message: impl Into<String>, details: Value) -> Self {
        Event::Status {
            step,
            message: message.into(),
            details: Some(details),
        }
    }

    /// The wire tag used as the SSE `event:` line (§4.H).
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::Status { .. } => "status",
            Event::Content { .. } => "content",
            Event::Sources { .. } => "sources",
            Event::Metadata(_) => "metadata",
            Event::Error { .. } => "error",
            Event::Done => "done",
        }
    }
}
