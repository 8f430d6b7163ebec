//! `retrieve_chunks` built-in tool (§4.B).

use std::sync::Arc;

use async_trait::async_trait;
use scholarly_core::traits::tool::{Tool, ToolCategory, ToolResult, ToolSchema};
use scholarly_search::{SearchFilters, SearchIndex};
use serde_json::{json, Value};

pub struct RetrieveChunksTool {
    index: Arc<dyn SearchIndex>,
}

impl RetrieveChunksTool {
    #[must_use]
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for RetrieveChunksTool {
    fn name(&self) -> &str {
        "retrieve_chunks"
    }

    fn description(&self) -> &str {
        "Search the indexed paper corpus for chunks relevant to a query using hybrid vector+lexical retrieval."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "the search query"},
                    "top_k": {"type": "integer", "minimum": 1, "maximum": 10}
                }
            }),
            required: vec!["query".to_string()],
        }
    }

    async fn invoke(&self, args: Value) -> ToolResult {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return ToolResult::failed(self.name(), "missing required argument: query");
        };
        let top_k = args
            .get("top_k")
            .and_then(Value::as_u64)
            .map(|v| v as usize)
            .unwrap_or(10)
            .min(10)
            .max(1);

        match self.index.search(query, top_k, &SearchFilters::default()).await {
            Ok(results) => {
                let arxiv_ids: Vec<String> = {
                    let mut ids: Vec<String> =
                        results.iter().map(|(chunk, _)| chunk.arxiv_id.clone()).collect();
                    ids.sort();
                    ids.dedup();
                    ids
                };
                let paper_filters = scholarly_search::SearchFilters {
                    arxiv_ids: Some(arxiv_ids.clone()),
                    ..Default::default()
                };
                let papers = self
                    .index
                    .list_papers(&paper_filters, arxiv_ids.len().max(1), 0)
                    .await
                    .map(|(papers, _)| papers)
                    .unwrap_or_default();
                let title_of = |arxiv_id: &str| -> (String, Vec<String>, Option<chrono::DateTime<chrono::Utc>>) {
                    papers
                        .iter()
                        .find(|p| p.arxiv_id == arxiv_id)
                        .map(|p| (p.title.clone(), p.authors.clone(), p.published_date))
                        .unwrap_or_default()
                };

                let chunks: Vec<Value> = results
                    .iter()
                    .map(|(chunk, score)| {
                        let (title, authors, published_date) = title_of(&chunk.arxiv_id);
                        json!({
                            "arxiv_id": chunk.arxiv_id,
                            "title": title,
                            "authors": authors,
                            "published_date": published_date,
                            "chunk_index": chunk.chunk_index,
                            "chunk_text": chunk.text,
                            "score": score,
                            "section": chunk.section_name,
                            "page": chunk.page_number,
                        })
                    })
                    .collect();
                let count = chunks.len();
                ToolResult::ok(self.name(), json!({"chunks": chunks, "count": count}))
            }
            Err(e) => ToolResult::failed(self.name(), e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait as _async_trait;
    use scholarly_core::error::Result;

    struct StubIndex;

    #[_async_trait]
    impl SearchIndex for StubIndex {
        async fn search(
            &self,
            _query: &str,
            _top_k: usize,
            _filters: &SearchFilters,
        ) -> Result<Vec<(scholarly_core::types::Chunk, f32)>> {
            Ok(Vec::new())
        }

        async fn list_papers(
            &self,
            _filters: &SearchFilters,
            _limit: usize,
            _offset: usize,
        ) -> Result<(Vec<scholarly_core::types::Paper>, usize)> {
            Ok((Vec::new(), 0))
        }
    }

    #[tokio::test]
    async fn missing_query_fails_without_raising() {
        let tool = RetrieveChunksTool::new(Arc::new(StubIndex));
        let result = tool.invoke(json!({})).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn empty_results_still_succeed() {
        let tool = RetrieveChunksTool::new(Arc::new(StubIndex));
        let result = tool.invoke(json!({"query": "x"})).await;
        assert!(result.success);
        assert_eq!(result.data.unwrap()["count"], 0);
    }
}
