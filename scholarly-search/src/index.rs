//! Hybrid search engine (§4.A): vector + lexical retrieval fused with
//! Reciprocal Rank Fusion.
//!
//! Grounded on the teacher's `llmspell-rag/src/traits/hybrid.rs`
//! (`HybridQuery`/`HybridResult`/`RerankingStrategy::ReciprocalRankFusion`),
//! generalized here into the concrete deterministic algorithm spec.md §4.A
//! specifies rather than a strategy enum, since this spec fixes RRF as the
//! only fusion strategy.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use scholarly_core::error::{Error, Result};
use scholarly_core::types::{Chunk, Paper};
use uuid::Uuid;

use crate::embedder::Embedder;
use crate::filters::SearchFilters;
use crate::lexical::{tf_idf_scores, tokenize};

/// RRF constant (§9 Open Question: "k=60 is the common default and is
/// assumed here").
const RRF_K: f32 = 60.0;

/// `search`/`list_papers` over an indexed corpus of papers and chunks.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(Chunk, f32)>>;

    async fn list_papers(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Paper>, usize)>;

    /// Notifies the index that `arxiv_id` has new or changed chunks
    /// upstream. No-op by default: ingestion (out of scope) is the only
    /// caller, and no implementation in this workspace needs to react.
    /// Reserved so a future ingestion crate can depend on `SearchIndex`
    /// without requiring every implementation to grow a new method.
    fn reindex_hint(&self, _arxiv_id: &str) {}
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// A reference in-memory implementation of `SearchIndex`, standing in for
/// the (out-of-scope) vector+full-text store that ingestion populates.
/// Holds the whole corpus in memory and runs the exact §4.A algorithm
/// against it, which is enough to make the algorithm's invariants (§8
/// properties 5 and 6) independently testable without a database.
pub struct InMemorySearchIndex {
    papers: HashMap<Uuid, Paper>,
    chunks: Vec<Chunk>,
    embedder: Arc<dyn Embedder>,
    available: AtomicBool,
}

impl InMemorySearchIndex {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            papers: HashMap::new(),
            chunks: Vec::new(),
            embedder,
            available: AtomicBool::new(true),
        }
    }

    pub fn add_paper(&mut self, paper: Paper) {
        self.papers.insert(paper.id, paper);
    }

    pub fn add_chunk(&mut self, chunk: Chunk) {
        self.chunks.push(chunk);
    }

    /// Test/operational hook simulating the index becoming unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.available.store(!unavailable, Ordering::SeqCst);
    }

    fn filtered_chunks(&self, filters: &SearchFilters) -> Vec<&Chunk> {
        self.chunks
            .iter()
            .filter(|chunk| {
                if !filters.matches_arxiv_id(&chunk.arxiv_id) {
                    return false;
                }
                let Some(paper) = self.papers.get(&chunk.paper_ref) else {
                    return false;
                };
                filters.matches_categories(&paper.categories) && filters.matches_date(paper.published_date)
            })
            .collect()
    }
}

#[async_trait]
impl SearchIndex for InMemorySearchIndex {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filters: &SearchFilters,
    ) -> Result<Vec<(Chunk, f32)>> {
        if query.trim().is_empty() {
            return Err(Error::Validation("search query must not be empty".into()));
        }
        if !(1..=50).contains(&top_k) {
            return Err(Error::Validation(format!(
                "top_k must be in 1..50, got {top_k}"
            )));
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::IndexUnavailable("chunk index unreachable".into()));
        }

        let query_embedding = self
            .embedder
            .embed_one(query)
            .await
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))?;

        let candidates = self.filtered_chunks(filters);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let branch_n = std::cmp::max(50, top_k * 10);

        // Vector branch: rank by cosine similarity, descending.
        let mut vector_ranked: Vec<usize> = (0..candidates.len()).collect();
        vector_ranked.sort_by(|&a, &b| {
            let sa = cosine_similarity(&query_embedding, &candidates[a].embedding);
            let sb = cosine_similarity(&query_embedding, &candidates[b].embedding);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });
        vector_ranked.truncate(branch_n);
        let vector_rank: HashMap<usize, usize> = vector_ranked
            .iter()
            .enumerate()
            .map(|(rank, &idx)| (idx, rank + 1))
            .collect();

        // Lexical branch: TF-IDF over the same filtered candidate set.
        let query_tokens = tokenize(query);
        let documents: Vec<Vec<String>> = candidates
            .iter()
            .map(|c| c.lexical_index.clone())
            .collect();
        let lexical_scores = tf_idf_scores(&query_tokens, &documents);
        let mut lexical_ranked: Vec<usize> = (0..candidates.len()).collect();
        lexical_ranked.sort_by(|&a, &b| {
            lexical_scores[b]
                .partial_cmp(&lexical_scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        lexical_ranked.truncate(branch_n);
        let lexical_rank: HashMap<usize, usize> = lexical_ranked
            .iter()
            .enumerate()
            .map(|(rank, &idx)| (idx, rank + 1))
            .collect();

        // Fuse via Reciprocal Rank Fusion (§4.A step 4).
        let mut fused: Vec<(usize, f32)> = Vec::new();
        for idx in 0..candidates.len() {
            let v_rank = vector_rank.get(&idx);
            let l_rank = lexical_rank.get(&idx);
            if v_rank.is_none() && l_rank.is_none() {
                continue;
            }
            let mut score = 0.0;
            if let Some(&r) = v_rank {
                score += 1.0 / (RRF_K + r as f32);
            }
            if let Some(&r) = l_rank {
                score += 1.0 / (RRF_K + r as f32);
            }
            fused.push((idx, score));
        }

        fused.sort_by(|&(a, score_a), &(b, score_b)| {
            score_b
                .partial_cmp(&score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let ra = vector_rank.get(&a).copied().unwrap_or(usize::MAX);
                    let rb = vector_rank.get(&b).copied().unwrap_or(usize::MAX);
                    ra.cmp(&rb)
                })
                .then_with(|| {
                    let la = lexical_rank.get(&a).copied().unwrap_or(usize::MAX);
                    let lb = lexical_rank.get(&b).copied().unwrap_or(usize::MAX);
                    la.cmp(&lb)
                })
                .then_with(|| candidates[a].arxiv_id.cmp(&candidates[b].arxiv_id))
        });

        let top_score = fused.first().map(|&(_, s)| s).unwrap_or(0.0);
        if top_score <= 0.0 {
            return Ok(Vec::new());
        }

        Ok(fused
            .into_iter()
            .take(top_k)
            .map(|(idx, score)| (candidates[idx].clone(), score / top_score))
            .collect())
    }

    async fn list_papers(
        &self,
        filters: &SearchFilters,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Paper>, usize)> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(Error::IndexUnavailable("paper index unreachable".into()));
        }
        let mut matching: Vec<&Paper> = self
            .papers
            .values()
            .filter(|p| filters.matches_categories(&p.categories) && filters.matches_date(p.published_date))
            .collect();
        matching.sort_by(|a, b| a.arxiv_id.cmp(&b.arxiv_id));
        let total = matching.len();
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    struct StaticEmbedder {
        dim: usize,
        vectors: HashMap<String, Vec<f32>>,
    }

    #[async_trait]
    impl Embedder for StaticEmbedder {
        fn dimension(&self) -> usize {
            self.dim
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    self.vectors
                        .get(t)
                        .cloned()
                        .unwrap_or_else(|| vec![0.0; self.dim])
                })
                .collect())
        }
    }

    fn paper(arxiv_id: &str) -> Paper {
        Paper {
            id: Uuid::new_v4(),
            arxiv_id: arxiv_id.to_string(),
            title: format!("Paper {arxiv_id}"),
            authors: vec!["A. Author".to_string()],
            abstract_text: "abstract".to_string(),
            categories: vec!["cs.CL".to_string()],
            published_date: Some(Utc::now()),
            pdf_url: None,
            raw_text: None,
            sections: vec![],
        }
    }

    fn chunk(paper: &Paper, idx: u32, text: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: Uuid::new_v4(),
            paper_ref: paper.id,
            arxiv_id: paper.arxiv_id.clone(),
            chunk_index: idx,
            text: text.to_string(),
            section_name: None,
            page_number: None,
            word_count: text.split_whitespace().count() as u32,
            embedding,
            lexical_index: tokenize(text),
        }
    }

    fn build_index() -> InMemorySearchIndex {
        let mut vectors = HashMap::new();
        vectors.insert(
            "attention mechanisms in transformers".to_string(),
            vec![1.0, 0.0, 0.0],
        );
        let embedder = Arc::new(StaticEmbedder { dim: 3, vectors });
        let mut index = InMemorySearchIndex::new(embedder);

        let p1 = paper("1706.03762");
        let c1 = chunk(
            &p1,
            0,
            "attention mechanisms let transformers weigh context",
            vec![0.9, 0.1, 0.0],
        );
        let p2 = paper("1810.04805");
        let c2 = chunk(
            &p2,
            0,
            "bidirectional encoder representations from transformers",
            vec![0.1, 0.9, 0.0],
        );
        index.add_paper(p1);
        index.add_paper(p2);
        index.add_chunk(c1);
        index.add_chunk(c2);
        index
    }

    #[tokio::test]
    async fn search_is_idempotent() {
        let index = build_index();
        let filters = SearchFilters::default();
        let first = index
            .search("attention mechanisms in transformers", 2, &filters)
            .await
            .unwrap();
        let second = index
            .search("attention mechanisms in transformers", 2, &filters)
            .await
            .unwrap();
        assert_eq!(first.len(), second.len());
        for ((c1, s1), (c2, s2)) in first.iter().zip(second.iter()) {
            assert_eq!(c1.id, c2.id);
            assert!((s1 - s2).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn search_ranks_the_closer_vector_match_first() {
        let index = build_index();
        let filters = SearchFilters::default();
        let results = index
            .search("attention mechanisms in transformers", 2, &filters)
            .await
            .unwrap();
        assert_eq!(results[0].0.arxiv_id, "1706.03762");
        assert!(results[0].1 >= results[1].1);
        assert!((results[0].1 - 1.0).abs() < 1e-6, "top score normalizes to 1.0");
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let index = build_index();
        let filters = SearchFilters::default();
        assert!(index.search("", 2, &filters).await.is_err());
    }

    #[tokio::test]
    async fn unavailable_index_surfaces_error() {
        let index = build_index();
        index.set_unavailable(true);
        let filters = SearchFilters::default();
        let err = index
            .search("attention mechanisms in transformers", 2, &filters)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "index_unavailable");
    }

    #[tokio::test]
    async fn category_filter_excludes_non_matching_papers() {
        let index = build_index();
        let filters = SearchFilters {
            categories: Some(vec!["cs.CV".to_string()]),
            ..Default::default()
        };
        let results = index
            .search("attention mechanisms in transformers", 2, &filters)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
