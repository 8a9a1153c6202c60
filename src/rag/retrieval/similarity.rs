//! Cosine similarity
//!
//! `dot(a, b) / (‖a‖·‖b‖ + ε)`; the epsilon keeps all-zero vectors at a
//! score of 0 instead of NaN.

use crate::errors::{RagError, Result};

/// Guard against division by zero
pub const EPSILON: f32 = 1e-10;

/// Cosine similarity of two vectors of equal length
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(RagError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let (dot, norm_a, norm_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, na, nb), (x, y)| {
            (dot + x * y, na + x * x, nb + y * y)
        });

    Ok(dot / (norm_a.sqrt() * norm_b.sqrt() + EPSILON))
}
