//! Structured-output schemas and their deserialization targets for every
//! LLM-backed node (§4.E, §9 "Structured LLM outputs").

use scholarly_core::schema::SchemaSpec;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Clone, Deserialize)]
pub struct GuardrailOutput {
    pub score: i32,
    pub reasoning: String,
}

pub fn guardrail_schema() -> SchemaSpec {
    SchemaSpec::new(
        "guardrail",
        json!({
            "type": "object",
            "properties": {
                "score": {"type": "integer", "minimum": 0, "maximum": 100},
                "reasoning": {"type": "string"}
            },
            "required": ["score", "reasoning"]
        }),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterOutput {
    #[serde(default)]
    pub next_tool: Option<String>,
    #[serde(default)]
    pub tool_args: Option<serde_json::Value>,
    pub rationale: String,
    pub should_generate: bool,
}

pub fn router_schema() -> SchemaSpec {
    SchemaSpec::new(
        "router",
        json!({
            "type": "object",
            "properties": {
                "next_tool": {"type": ["string", "null"]},
                "tool_args": {"type": ["object", "null"]},
                "rationale": {"type": "string"},
                "should_generate": {"type": "boolean"}
            },
            "required": ["rationale", "should_generate"]
        }),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkGrade {
    pub relevant: bool,
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraderOutput {
    pub results: Vec<ChunkGrade>,
}

/// One structured call grades a batch of chunks at once, returning one
/// `{relevant, reason}` verdict per chunk in the same order (§4.E Grader:
/// "For each chunk (batched)").
pub fn grader_schema() -> SchemaSpec {
    SchemaSpec::new(
        "grader",
        json!({
            "type": "object",
            "properties": {
                "results": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "relevant": {"type": "boolean"},
                            "reason": {"type": "string"}
                        },
                        "required": ["relevant", "reason"]
                    }
                }
            },
            "required": ["results"]
        }),
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewriterOutput {
    pub rewritten_query: String,
    pub reason: String,
}

pub fn rewriter_schema() -> SchemaSpec {
    SchemaSpec::new(
        "rewriter",
        json!({
            "type": "object",
            "properties": {
                "rewritten_query": {"type": "string"},
                "reason": {"type": "string"}
            },
            "required": ["rewritten_query", "reason"]
        }),
    )
}
