//! Type definitions module
//!
//! Core data model shared by the chunker, index store, retriever and
//! answer pipeline.

pub mod index;
pub mod request;

// Re-export commonly used types
pub use index::{Chunk, Index, RetrievalResult};
pub use request::{AskRequest, FileKind, SessionId, UploadedFile};
