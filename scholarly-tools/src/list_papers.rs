//! `list_papers` introspection tool (§4.A, §4.B optional built-in).

use std::sync::Arc;

use async_trait::async_trait;
use scholarly_core::traits::tool::{Tool, ToolCategory, ToolResult, ToolSchema};
use scholarly_search::{SearchFilters, SearchIndex};
use serde_json::{json, Value};

pub struct ListPapersTool {
    index: Arc<dyn SearchIndex>,
}

impl ListPapersTool {
    #[must_use]
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for ListPapersTool {
    fn name(&self) -> &str {
        "list_papers"
    }

    fn description(&self) -> &str {
        "List papers in the corpus, optionally filtered by category, with pagination."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Introspection
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            parameters: json!({
                "type": "object",
                "properties": {
                    "categories": {"type": "array", "items": {"type": "string"}},
                    "limit": {"type": "integer", "minimum": 1},
                    "offset": {"type": "integer", "minimum": 0}
                }
            }),
            required: vec![],
        }
    }

    async fn invoke(&self, args: Value) -> ToolResult {
        let categories = args
            .get("categories")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            });
        let limit = args
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(20) as usize;
        let offset = args
            .get("offset")
            .and_then(Value::as_u64)
            .unwrap_or(0) as usize;

        let filters = SearchFilters {
            categories,
            ..Default::default()
        };

        match self.index.list_papers(&filters, limit, offset).await {
            Ok((papers, total)) => {
                let items: Vec<Value> = papers
                    .iter()
                    .map(|p| {
                        json!({
                            "arxiv_id": p.arxiv_id,
                            "title": p.title,
                            "authors": p.authors,
                            "categories": p.categories,
                            "published_date": p.published_date,
                        })
                    })
                    .collect();
                ToolResult::ok(self.name(), json!({"papers": items, "total": total}))
            }
            Err(e) => ToolResult::failed(self.name(), e.to_string()),
        }
    }
}
