//! Retrieval engine for semantic search
//!
//! Scores every chunk of an index against a query vector, sorts descending
//! with a stable sort (ties keep index order) and keeps the first `k`.

use serde::{Deserialize, Serialize};

use crate::errors::{RagError, Result};
use crate::rag::retrieval::similarity::cosine_similarity;
use crate::types::{Index, RetrievalResult};

/// Chunks returned per query
pub const DEFAULT_TOP_K: usize = 5;

/// Search parameters for retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of results to retrieve
    pub top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Top-`k` chunks by cosine similarity to `query`
///
/// Returns `min(k, index.len())` results with non-increasing scores. An
/// empty index yields an empty vector; a query whose length differs from
/// the index dimension is a `DimensionMismatch`.
pub fn top_k(query: &[f32], index: &Index, k: usize) -> Result<Vec<RetrievalResult>> {
    if let Some(dimension) = index.dimension() {
        if dimension != query.len() {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: query.len(),
            });
        }
    }

    let mut scored = index
        .chunks()
        .iter()
        .map(|chunk| cosine_similarity(query, &chunk.embedding).map(|score| (score, chunk)))
        .collect::<Result<Vec<_>>>()?;

    // sort_by is stable
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(score, chunk)| RetrievalResult {
            id: chunk.id.clone(),
            source: chunk.source.clone(),
            text: chunk.text.clone(),
            score,
        })
        .collect())
}

/// Retrieval engine holding default search parameters
#[derive(Debug, Clone, Default)]
pub struct RetrievalEngine {
    default_params: SearchParams,
}

impl RetrievalEngine {
    /// Create new retrieval engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom default parameters
    pub fn with_params(params: SearchParams) -> Self {
        Self {
            default_params: params,
        }
    }

    /// Retrieve chunks matching a query vector
    pub fn retrieve(&self, query: &[f32], index: &Index) -> Result<Vec<RetrievalResult>> {
        top_k(query, index, self.default_params.top_k)
    }

    /// Get default search parameters
    pub fn default_params(&self) -> &SearchParams {
        &self.default_params
    }

    /// Update default search parameters
    pub fn set_default_params(&mut self, params: SearchParams) {
        self.default_params = params;
    }
}
