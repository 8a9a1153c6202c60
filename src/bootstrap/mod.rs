//! Bootstrap for ResumeBuddy
//!
//! Wires Gemini clients, index storages and the answer pipeline from a
//! loaded [`Config`].

use std::sync::Arc;

use crate::chunking::SentenceChunker;
use crate::cli::Config;
use crate::embedding::{Embedder, EmbeddingProvider, GeminiEmbeddingClient};
use crate::errors::Result;
use crate::index::{DurableStorage, EphemeralScopedStorage, IndexStore, SessionIndexCache};
use crate::models::GeminiModelClient;
use crate::rag::{AnswerPipeline, PipelineConfig, SearchParams};
use crate::streaming::{GeminiGenerationClient, GenerationProvider};

/// Embedding client for the configured model
pub fn embedding_provider(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let client = GeminiEmbeddingClient::with_config(
        &config.gemini.base_url,
        config.require_api_key()?,
        &config.gemini.embed_model,
    )?;
    Ok(Arc::new(client))
}

/// Generation client for the configured model
pub fn generation_provider(config: &Config) -> Result<Arc<dyn GenerationProvider>> {
    let client = GeminiGenerationClient::with_config(
        &config.gemini.base_url,
        config.require_api_key()?,
        &config.gemini.chat_model,
    )?;
    Ok(Arc::new(client))
}

/// Model catalog client
pub fn model_client(config: &Config) -> Result<GeminiModelClient> {
    GeminiModelClient::new(&config.gemini.base_url, config.require_api_key()?)
}

/// Batching embedder with the configured pacing
pub fn embedder(config: &Config, provider: Arc<dyn EmbeddingProvider>) -> Embedder {
    Embedder::with_config(provider, config.embedding.batch_size, config.rate_limit_policy())
}

/// Index store with the standard storage priority
pub fn index_store(config: &Config, embedder: Embedder) -> IndexStore {
    let cache = Arc::new(SessionIndexCache::with_limits(
        config.session_ttl(),
        config.index.max_sessions,
    ));
    let ephemeral = EphemeralScopedStorage::with_limits(
        config
            .ephemeral_dir()
            .unwrap_or_else(EphemeralScopedStorage::default_dir),
        config.session_ttl(),
        config.index.max_sessions,
    );

    IndexStore::new(
        SentenceChunker::with_budget(config.index.chunk_size),
        embedder,
        cache,
        ephemeral,
        DurableStorage::new(config.artifact_path()),
    )
}

/// Pipeline settings from configuration
pub fn pipeline_config(config: &Config) -> PipelineConfig {
    PipelineConfig {
        search: SearchParams {
            top_k: config.index.top_k,
        },
        generation: config.generation_config(),
    }
}

/// Fully wired answer pipeline over the given store
pub fn answer_pipeline(config: &Config, store: Arc<IndexStore>) -> Result<AnswerPipeline> {
    Ok(AnswerPipeline::with_config(
        store,
        generation_provider(config)?,
        pipeline_config(config),
    ))
}
