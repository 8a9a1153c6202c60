//! ResumeBuddy - retrieval-augmented question answering over résumés
//!
//! Documents are split into sentence-aligned chunks, embedded through the
//! Gemini API and kept in an index. Questions are embedded the same way,
//! matched against the index by cosine similarity, and answered by a
//! streaming Gemini model with the best chunks as context.
//!
//! # Architecture
//!
//! - **chunking**: sentence-aligned passages under a character budget
//! - **embedding**: batched, paced embedding calls
//! - **index**: shared corpus and per-session indexes behind prioritized storages
//! - **rag**: retrieval, prompt assembly and the streaming answer pipeline
//! - **streaming** / **models**: Gemini HTTP clients and wire types

pub mod errors;
pub mod types;

// Core retrieval stack
pub mod chunking;
pub mod embedding;
pub mod index;
pub mod models;
pub mod rag;
pub mod streaming;

// Re-export commonly used types
pub use errors::{IndexMissing, RagError, Result};

// Command-line surface
pub mod bootstrap;
pub mod cli;
pub mod doctor;
