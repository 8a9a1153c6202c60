//! Embedded chunks and the immutable index snapshot built from them

use serde::{Deserialize, Serialize, Serializer};

use crate::errors::{RagError, Result};

/// A passage of a source document together with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within one index
    pub id: String,
    /// Document identifier the passage came from
    pub source: String,
    /// Passage text
    pub text: String,
    /// Embedding vector, same length for every chunk of an index
    pub embedding: Vec<f32>,
}

/// Ordered, immutable collection of embedded chunks
///
/// An index is built once and shared by reference afterwards. Rebuilding
/// produces a new `Index`; nothing mutates an existing one. On disk it is a
/// plain JSON array of [`Chunk`] records.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<Chunk>")]
pub struct Index {
    chunks: Vec<Chunk>,
}

impl Index {
    /// Create an index, rejecting chunks whose embeddings differ in length
    pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
        if let Some(first) = chunks.first() {
            let expected = first.embedding.len();
            if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
                return Err(RagError::DimensionMismatch {
                    expected,
                    actual: bad.embedding.len(),
                });
            }
        }

        Ok(Self { chunks })
    }

    /// Index with no chunks
    pub fn empty() -> Self {
        Self::default()
    }

    /// Chunks in build order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimensionality, `None` for an empty index
    pub fn dimension(&self) -> Option<usize> {
        self.chunks.first().map(|c| c.embedding.len())
    }

    /// Distinct sources in first-seen order
    pub fn sources(&self) -> Vec<String> {
        let mut sources: Vec<String> = Vec::new();
        for chunk in &self.chunks {
            if !sources.iter().any(|s| s == &chunk.source) {
                sources.push(chunk.source.clone());
            }
        }
        sources
    }
}

impl TryFrom<Vec<Chunk>> for Index {
    type Error = RagError;

    fn try_from(chunks: Vec<Chunk>) -> Result<Self> {
        Index::new(chunks)
    }
}

impl Serialize for Index {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.chunks.serialize(serializer)
    }
}

/// One scored hit from a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub source: String,
    pub text: String,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
}
