//! Gemini API client for model catalog operations
//!
//! Low-level HTTP client for `GET /v1beta/models`, plus the endpoint and
//! HTTP client helpers shared by the embedding and generation clients.

use crate::errors::{RagError, Result};
use crate::models::types::{ModelInfo, ModelsResponse, API_VERSION};
use reqwest::Client;
use std::time::Duration;

/// Default Gemini API endpoint
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Whole-request timeout for calls with a bounded response (30 seconds)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Time allowed to establish a connection (10 seconds)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts for one kind of Gemini call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub connect: Duration,
    /// Covers the whole exchange including the body; `None` for streams
    pub total: Option<Duration>,
}

impl HttpTimeouts {
    /// Embedding and model catalog calls
    pub const fn request() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            total: Some(REQUEST_TIMEOUT),
        }
    }

    /// Streamed generation: the body may take as long as the model talks
    pub const fn streaming() -> Self {
        Self {
            connect: CONNECT_TIMEOUT,
            total: None,
        }
    }

    /// Build a reqwest client with these timeouts
    pub(crate) fn client(&self) -> Result<Client> {
        let mut builder = Client::builder().connect_timeout(self.connect);
        if let Some(total) = self.total {
            builder = builder.timeout(total);
        }
        builder.build().map_err(RagError::HttpError)
    }
}

/// `{base}/v1beta/models/{model}:{method}`
pub(crate) fn model_endpoint(base_url: &str, model: &str, method: &str) -> String {
    let model = model.strip_prefix("models/").unwrap_or(model);
    format!(
        "{}/{}/models/{}:{}",
        base_url.trim_end_matches('/'),
        API_VERSION,
        model,
        method
    )
}

/// Reject an empty key before any request is made
pub(crate) fn require_key(api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(RagError::ConfigError(
            "GEMINI_API_KEY environment variable is not set".to_string(),
        ));
    }
    Ok(())
}

/// HTTP client for the Gemini model catalog
#[derive(Debug, Clone)]
pub struct GeminiModelClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl GeminiModelClient {
    /// Create a new model catalog client
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        require_key(api_key)?;

        Ok(Self {
            client: HttpTimeouts::request().client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// List every model visible to the API key, following pagination
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/{}/models", self.base_url, API_VERSION);
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .query(&[("key", self.api_key.as_str()), ("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(|e| {
                RagError::GenerationApiError(format!("Failed to list models: {}", e))
            })?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                return Err(RagError::GenerationApiError(format!(
                    "HTTP {}: {}",
                    status, error_text
                )));
            }

            let page: ModelsResponse = response.json().await.map_err(|e| {
                RagError::GenerationApiError(format!("Failed to parse models: {}", e))
            })?;

            models.extend(page.models);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }

    /// Models usable for answering (support `generateContent`)
    pub async fn generation_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(filter_supporting(self.list_models().await?, "generateContent"))
    }

    /// Check whether the API accepts the key
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/{}/models", self.base_url, API_VERSION);

        match self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("pageSize", "1")])
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Keep models that support the given method, preserving order
pub fn filter_supporting(models: Vec<ModelInfo>, method: &str) -> Vec<ModelInfo> {
    models.into_iter().filter(|m| m.supports(method)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(name: &str, methods: &[&str]) -> ModelInfo {
        ModelInfo {
            name: format!("models/{}", name),
            display_name: None,
            description: None,
            supported_generation_methods: methods.iter().map(|m| m.to_string()).collect(),
        }
    }

    #[test]
    fn test_model_endpoint() {
        assert_eq!(
            model_endpoint("https://example.test/", "text-embedding-004", "embedContent"),
            "https://example.test/v1beta/models/text-embedding-004:embedContent"
        );
        assert_eq!(
            model_endpoint("https://example.test", "models/gemini-2.5-flash", "streamGenerateContent"),
            "https://example.test/v1beta/models/gemini-2.5-flash:streamGenerateContent"
        );
    }

    #[test]
    fn test_client_requires_key() {
        match GeminiModelClient::new(DEFAULT_GEMINI_URL, "  ") {
            Err(RagError::ConfigError(msg)) => assert!(msg.contains("GEMINI_API_KEY")),
            other => panic!("expected config error, got {:?}", other.map(|_| ())),
        }
        assert!(GeminiModelClient::new(DEFAULT_GEMINI_URL, "key").is_ok());
    }

    #[test]
    fn test_filter_supporting() {
        let models = vec![
            model("text-embedding-004", &["embedContent"]),
            model("gemini-2.5-flash", &["generateContent"]),
            model("gemini-2.5-pro", &["generateContent", "countTokens"]),
        ];
        let names: Vec<String> = filter_supporting(models, "generateContent")
            .iter()
            .map(|m| m.short_name().to_string())
            .collect();
        assert_eq!(names, vec!["gemini-2.5-flash", "gemini-2.5-pro"]);
    }
}
