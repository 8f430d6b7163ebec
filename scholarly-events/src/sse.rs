//! SSE wire encoding (§4.H).

use serde_json::{json, Value};

use crate::event::Event;

fn payload(event: &Event) -> Value {
    match event {
        Event::Status {
            step,
            message,
            details,
        } => {
            let mut body = json!({
                "step": serde_json::to_value(step).expect("Step always serializes"),
                "message": message,
            });
            if let Some(details) = details {
                body["details"] = details.clone();
            }
            body
        }
        Event::Content { token } => json!({ "token": token }),
        Event::Sources { sources } => json!({ "sources": sources }),
        Event::Metadata(metadata) => {
            serde_json::to_value(metadata).expect("Metadata always serializes")
        }
        Event::Error { error, code } => {
            let mut body = json!({ "error": error });
            if let Some(code) = code {
                body["code"] = json!(code);
            }
            body
        }
        Event::Done => json!({}),
    }
}

/// Encodes one event as a complete `text/event-stream` frame:
/// `event: <type>\ndata: <json>\n\n` (§4.H). Contains no embedded blank
/// lines, so frames can be concatenated directly onto a response body.
#[must_use]
pub fn encode(event: &Event) -> String {
    format!(
        "event: {}\ndata: {}\n\n",
        event.type_name(),
        payload(event)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Metadata, Step};

    #[test]
    fn status_frame_has_expected_shape() {
        let frame = encode(&Event::status(Step::Guardrail, "scoring"));
        assert_eq!(
            frame,
            "event: status\ndata: {\"message\":\"scoring\",\"step\":\"guardrail\"}\n\n"
        );
    }

    #[test]
    fn done_frame_has_empty_object_body() {
        let frame = encode(&Event::Done);
        assert_eq!(frame, "event: done\ndata: {}\n\n");
    }

    #[test]
    fn metadata_frame_flattens_fields_without_a_wrapper_key() {
        let frame = encode(&Event::Metadata(Metadata {
            session_id: Some("s1".to_string()),
            turn_number: 0,
            execution_time_ms: 42,
            retrieval_attempts: 1,
            rewritten_query: None,
            guardrail_score: Some(90),
            provider: "fake".to_string(),
            model: "fake-model-v1".to_string(),
            reasoning_steps: vec![],
            error: None,
        }));
        assert!(frame.starts_with("event: metadata\ndata: {"));
        assert!(frame.contains("\"turn_number\":0"));
        assert!(!frame.contains("\"Metadata\""));
    }

    #[test]
    fn error_frame_omits_code_when_absent() {
        let frame = encode(&Event::Error {
            error: "boom".to_string(),
            code: None,
        });
        assert_eq!(frame, "event: error\ndata: {\"error\":\"boom\"}\n\n");
    }
}
