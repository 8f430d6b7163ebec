//! Deterministic placeholder `Embedder` (§1: the embedding service is an
//! out-of-scope external collaborator). Hashes each text into a unit
//! vector of the configured dimension so the binary is runnable without a
//! network dependency; never meant to produce semantically useful
//! vectors.

use async_trait::async_trait;
use scholarly_core::error::Result;
use scholarly_search::Embedder;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.hash_vector(text)).collect())
    }
}

impl HashEmbedder {
    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let bits = hasher.finish();
            vector.push((bits % 2000) as f32 / 1000.0 - 1.0);
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let embedder = HashEmbedder::new(16);
        let a = embedder.embed_one("hello world").await.unwrap();
        let b = embedder.embed_one("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn distinct_text_embeds_differently() {
        let embedder = HashEmbedder::new(16);
        let a = embedder.embed_one("hello").await.unwrap();
        let b = embedder.embed_one("goodbye").await.unwrap();
        assert_ne!(a, b);
    }
}
