//! `web_search` built-in tool (§4.B). Transport failures never raise —
//! they produce `ToolResult { success: false, .. }` so the executor can
//! record them in `tool_history` and the router can fall back (§4.F, S6).

use async_trait::async_trait;
use scholarly_core::traits::tool::{Tool, ToolCategory, ToolResult, ToolSchema};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Thin seam over the actual external search API, so the tool itself can
/// be unit tested with a stub client instead of a live network call.
#[async_trait]
pub trait WebSearchClient: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// `reqwest`-backed client for a generic JSON web-search API.
pub struct HttpWebSearchClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpWebSearchClient {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl WebSearchClient for HttpWebSearchClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, String> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("max_results", &max_results.to_string())]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("web search upstream returned {}", response.status()));
        }
        response
            .json::<Vec<WebResult>>()
            .await
            .map_err(|e| e.to_string())
    }
}

pub struct WebSearchTool {
    client: Box<dyn WebSearchClient>,
}

impl WebSearchTool {
    #[must_use]
    pub fn new(client: Box<dyn WebSearchClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the public web for information outside the indexed paper corpus."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "max_results": {"type": "integer", "minimum": 1, "maximum": 10}
                }
            }),
            required: vec!["query".to_string()],
        }
    }

    async fn invoke(&self, args: Value) -> ToolResult {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolResult::failed(self.name(), "missing required argument: query");
        };
        let max_results = args
            .get("max_results")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(5)
            .min(10)
            .max(1);

        match self.client.search(query, max_results).await {
            Ok(results) => ToolResult::ok(self.name(), json!({"results": results})),
            Err(e) => ToolResult::failed(self.name(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingClient;

    #[async_trait]
    impl WebSearchClient for FailingClient {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebResult>, String> {
            Err("upstream timeout".to_string())
        }
    }

    struct WorkingClient;

    #[async_trait]
    impl WebSearchClient for WorkingClient {
        async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<WebResult>, String> {
            Ok(vec![WebResult {
                title: "Result".to_string(),
                url: "https://example.com".to_string(),
                snippet: "snippet".to_string(),
            }])
        }
    }

    #[tokio::test]
    async fn upstream_failure_yields_success_false_not_a_panic() {
        let tool = WebSearchTool::new(Box::new(FailingClient));
        let result = tool.invoke(json!({"query": "rust"})).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("upstream timeout"));
    }

    #[tokio::test]
    async fn success_path_returns_results() {
        let tool = WebSearchTool::new(Box::new(WorkingClient));
        let result = tool.invoke(json!({"query": "rust"})).await;
        assert!(result.success);
    }
}
