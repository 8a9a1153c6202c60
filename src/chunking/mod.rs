//! Document chunking
//!
//! Splits raw document text into sentence-aligned passages that stay within
//! a character budget.

pub mod chunker;

// Re-export commonly used types
pub use chunker::{source_id_from_name, split_sentences, Passage, SentenceChunker, CHUNK_SIZE};
