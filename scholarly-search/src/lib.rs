//! ABOUTME: Hybrid vector+lexical search engine over indexed paper chunks
//! ABOUTME: Grounded on llmspell-rag's hybrid retrieval traits, generalized to the fixed RRF algorithm §4.A specifies

pub mod embedder;
pub mod filters;
pub mod index;
pub mod lexical;

pub use embedder::Embedder;
pub use filters::SearchFilters;
pub use index::{InMemorySearchIndex, SearchIndex};
