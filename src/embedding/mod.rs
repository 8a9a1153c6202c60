//! Embedding generation
//!
//! Turns passages and queries into vectors through an external embedding
//! service, with batching and rate-limit pacing.

pub mod client;
pub mod embedder;
pub mod pacing;

// Re-export commonly used types
pub use client::{EmbeddingProvider, GeminiEmbeddingClient, DEFAULT_EMBED_MODEL};
pub use embedder::{Embedder, DEFAULT_BATCH_SIZE};
pub use pacing::RateLimitPolicy;
