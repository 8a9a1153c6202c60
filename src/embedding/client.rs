//! Embedding service client
//!
//! One request per text against Gemini `embedContent`. Non-2xx responses
//! and bodies without an `embedding.values` number array are hard failures.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::errors::{RagError, Result};
use crate::models::client::{model_endpoint, require_key, HttpTimeouts};
use crate::models::types::{Content, EmbedContentRequest};

/// Default embedding model
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";

/// Anything that can embed a single text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text into a vector
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier, recorded for diagnostics
    fn model(&self) -> &str;
}

/// Gemini REST embedding client
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingClient {
    client: Client,
    timeouts: HttpTimeouts,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiEmbeddingClient {
    /// Create client with custom configuration
    pub fn with_config(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        require_key(api_key)?;
        if model.trim().is_empty() {
            return Err(RagError::ConfigError(
                "embedding model name is empty".to_string(),
            ));
        }

        Ok(Self {
            client: HttpTimeouts::request().client()?,
            timeouts: HttpTimeouts::request(),
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> HttpTimeouts {
        self.timeouts
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = model_endpoint(&self.base_url, &self.model, "embedContent");
        let request = EmbedContentRequest {
            content: Content::text(text),
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::EmbeddingApiError(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RagError::EmbeddingApiError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RagError::EmbeddingApiError(format!("Failed to parse response: {}", e)))?;

        parse_embedding_response(&body)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extract `embedding.values` as a non-empty vector of numbers
pub fn parse_embedding_response(body: &Value) -> Result<Vec<f32>> {
    let values = body
        .get("embedding")
        .and_then(|e| e.get("values"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            RagError::EmbeddingApiError("Invalid embedding response format".to_string())
        })?;

    if values.is_empty() {
        return Err(RagError::EmbeddingApiError(
            "Embedding response contained an empty vector".to_string(),
        ));
    }

    values
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| {
                RagError::EmbeddingApiError(format!("Non-numeric embedding value: {}", v))
            })
        })
        .collect()
}
