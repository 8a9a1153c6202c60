//! Error types for ResumeBuddy
//!
//! One error enum covers the whole retrieval stack. Callers branch on the
//! category helpers (`is_external_service`, `is_not_found`) to decide whether
//! a failure degrades to a general-knowledge answer or ends the request.

use thiserror::Error;

use crate::types::SessionId;

/// Why no index could be resolved for a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexMissing {
    /// The shared corpus was never built at this location
    #[error("No corpus index found at {path}. Run `resumebuddy build` or upload files to analyze.")]
    NoCorpus { path: String },

    /// Session index was built earlier but this instance can no longer see it
    #[error(
        "Uploaded-file index for session {session} is not available on this instance \
         (it may not have persisted across instances). Upload the files again."
    )]
    SessionExpired { session: SessionId },
}

/// Main error type for the retrieval and answer pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Missing credentials, model names or invalid settings
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Malformed request, rejected before any pipeline work
    #[error("Invalid request: {0}")]
    ValidationError(String),

    /// Embedding service call failed or returned a malformed body
    #[error("Embedding API error: {0}")]
    EmbeddingApiError(String),

    /// Generation service call failed
    #[error("Generation API error: {0}")]
    GenerationApiError(String),

    /// No index available for the requested scope
    #[error("{0}")]
    NotFound(#[from] IndexMissing),

    /// Vectors of different lengths compared or mixed in one index
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Storage refused an operation or failed to persist
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Streaming errors
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// Server-sent event payload parse errors
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Answer pipeline state machine errors
    #[error("Invalid pipeline transition from {from} via {event}")]
    InvalidTransition { from: String, event: String },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl RagError {
    /// Failure of an external collaborator (embedding or generation service)
    pub fn is_external_service(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingApiError(_)
                | RagError::GenerationApiError(_)
                | RagError::HttpError(_)
                | RagError::StreamingError(_)
        )
    }

    /// No index for the requested scope
    pub fn is_not_found(&self) -> bool {
        matches!(self, RagError::NotFound(_))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors to RagError
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::Generic(err.to_string())
    }
}
