//! `Tool` trait and supporting types (§4.B Tool registry).
//!
//! Grounded on the teacher's `llmspell-core/src/traits/tool.rs`: a small
//! trait object interface with a JSON-schema-like parameter description,
//! generalized here so the router and executor can drive it without
//! knowing about any concrete tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Grouping used only for presentation in the router prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCategory {
    Retrieval,
    Web,
    Introspection,
}

/// JSON-schema-like description of a tool's parameters, used both for
/// prompting the router and for validating `tool_args` before invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub parameters: Value,
    pub required: Vec<String>,
}

/// Outcome of a tool invocation. Tools never raise; callers inspect
/// `success` and `error` (§4.B: "tools never raise").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
    pub tool_name: String,
}

impl ToolResult {
    #[must_use]
    pub fn ok(tool_name: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            tool_name: tool_name.into(),
        }
    }

    #[must_use]
    pub fn failed(tool_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            tool_name: tool_name.into(),
        }
    }
}

/// A name-addressable, schema-described async tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique, stable tool name used by the router and `tool_history`.
    fn name(&self) -> &str;

    /// One-line description shown to the router's LLM prompt.
    fn description(&self) -> &str;

    /// Presentational grouping.
    fn category(&self) -> ToolCategory;

    /// Parameter schema, used for router prompting and argument validation.
    fn schema(&self) -> ToolSchema;

    /// Validate `args` against `schema()` before invocation. The default
    /// implementation checks only that every required key is present;
    /// callers needing full JSON-schema validation can override.
    fn validate(&self, args: &Value) -> Result<(), String> {
        let schema = self.schema();
        let obj = args
            .as_object()
            .ok_or_else(|| "tool_args must be a JSON object".to_string())?;
        for key in &schema.required {
            if !obj.contains_key(key) {
                return Err(format!("missing required argument: {key}"));
            }
        }
        Ok(())
    }

    /// Invoke the tool. Never raises; failures are reported in the result.
    async fn invoke(&self, args: Value) -> ToolResult;
}
