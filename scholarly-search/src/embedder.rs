//! Embedding service contract (§1: "Embedding service: `embed(texts) ->
//! vectors of fixed dimension d`"). The concrete service is out of scope;
//! this trait is the seam the hybrid search engine calls through.

use async_trait::async_trait;
use scholarly_core::error::Result;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Advertised embedding dimension; every vector this embedder returns
    /// has exactly this many components.
    fn dimension(&self) -> usize;

    /// Embed a batch of texts in one call.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Convenience for a single query string.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        Ok(vectors.pop().unwrap_or_default())
    }
}
