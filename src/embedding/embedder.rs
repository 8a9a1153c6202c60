//! Batching embedder
//!
//! Embeds a sequence of texts in fixed-size batches through an
//! [`EmbeddingProvider`], paced by a [`RateLimitPolicy`].
//!
//! Guarantees:
//! - Alignment: output `i` is the embedding of input `i`
//! - Fail-fast: the first failed call fails the whole operation, no
//!   partial result is ever returned

use futures_util::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::embedding::client::EmbeddingProvider;
use crate::embedding::pacing::RateLimitPolicy;
use crate::errors::{RagError, Result};

/// Texts per batch
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Progress callback, called after each batch with `(embedded, total)`
pub type BatchProgress = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Embedder over an external embedding service
#[derive(Clone)]
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    policy: RateLimitPolicy,
    progress: Option<BatchProgress>,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.provider.model())
            .field("batch_size", &self.batch_size)
            .field("policy", &self.policy)
            .finish()
    }
}

impl Embedder {
    /// Create embedder with default batching and pacing
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_config(provider, DEFAULT_BATCH_SIZE, RateLimitPolicy::default())
    }

    /// Create embedder with custom batch size and pacing
    pub fn with_config(
        provider: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
            policy,
            progress: None,
        }
    }

    /// Report progress after every batch
    pub fn with_progress(mut self, progress: BatchProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Embed every text, preserving order
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let total_batches = texts.len().div_ceil(self.batch_size);
        let mut vectors = Vec::with_capacity(texts.len());

        info!(
            texts = texts.len(),
            batches = total_batches,
            model = self.provider.model(),
            "Generating embeddings"
        );

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(
                batch = batch_index + 1,
                total = total_batches,
                size = batch.len(),
                "Processing embedding batch"
            );

            // buffered() yields in submission order even with concurrency > 1
            let batch_vectors: Vec<Vec<f32>> = stream::iter(batch)
                .map(|text| self.paced_embed(text))
                .buffered(self.policy.max_concurrent())
                .boxed()
                .try_collect()
                .await?;

            vectors.extend(batch_vectors);

            info!(
                batch = batch_index + 1,
                total = total_batches,
                vectors = vectors.len(),
                "Completed embedding batch"
            );
            if let Some(progress) = &self.progress {
                progress(vectors.len(), texts.len());
            }
        }

        if vectors.len() != texts.len() {
            return Err(RagError::EmbeddingApiError(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }

        Ok(vectors)
    }

    /// Embed a single query text
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.provider.embed(text).await
    }

    /// Model identifier of the underlying provider
    pub fn model(&self) -> &str {
        self.provider.model()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    async fn paced_embed(&self, text: &str) -> Result<Vec<f32>> {
        let vector = self.provider.embed(text).await.map_err(|e| {
            warn!(error = %e, "Error embedding text chunk");
            e
        })?;
        self.policy.pace().await;
        Ok(vector)
    }
}
