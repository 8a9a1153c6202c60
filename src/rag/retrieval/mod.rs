//! Similarity search over an index
//!
//! Exact linear-scan nearest neighbours by cosine similarity.

pub mod engine;
pub mod similarity;

// Re-export key types
pub use engine::{top_k, RetrievalEngine, SearchParams, DEFAULT_TOP_K};
pub use similarity::{cosine_similarity, EPSILON};
