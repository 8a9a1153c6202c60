//! Gemini streaming generation client
//!
//! Streams answer text from `models/{model}:streamGenerateContent?alt=sse`:
//! - HTTP/1.1 streaming via reqwest
//! - One SSE event per response fragment, decoded by [`SseParser`]
//! - Empty fragments are skipped, a blocked prompt ends the stream with an error

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::errors::{RagError, Result};
use crate::models::client::{model_endpoint, require_key, HttpTimeouts};
use crate::models::types::{Content, GenerateContentRequest, GenerationConfig};
use crate::models::DEFAULT_GEMINI_URL;
use crate::streaming::parser::SseParser;

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Ordered stream of text fragments
pub type TextStream = BoxStream<'static, Result<String>>;

/// Anything that can stream an answer for a prompt
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Start generating; errors before the first fragment are returned here,
    /// errors mid-stream are items of the stream
    async fn stream_generate(&self, prompt: &str, config: &GenerationConfig) -> Result<TextStream>;

    /// Model identifier
    fn model(&self) -> &str;
}

/// HTTP client for Gemini streamed generation
#[derive(Debug, Clone)]
pub struct GeminiGenerationClient {
    client: Client,
    timeouts: HttpTimeouts,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiGenerationClient {
    /// Create client with the default endpoint and model
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_config(DEFAULT_GEMINI_URL, api_key, DEFAULT_CHAT_MODEL)
    }

    /// Create client with custom configuration
    pub fn with_config(base_url: &str, api_key: &str, model: &str) -> Result<Self> {
        require_key(api_key)?;
        if model.trim().is_empty() {
            return Err(RagError::ConfigError("chat model name is empty".to_string()));
        }

        Ok(Self {
            client: HttpTimeouts::streaming().client()?,
            timeouts: HttpTimeouts::streaming(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// No total timeout: only connecting is bounded
    pub fn timeouts(&self) -> HttpTimeouts {
        self.timeouts
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationClient {
    async fn stream_generate(&self, prompt: &str, config: &GenerationConfig) -> Result<TextStream> {
        let url = model_endpoint(&self.base_url, &self.model, "streamGenerateContent");

        let request = GenerateContentRequest {
            contents: vec![Content::user(prompt)],
            generation_config: *config,
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Starting generation stream");

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse"), ("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::GenerationApiError(format!("Failed to send request: {}", e)))?;

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

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| RagError::StreamingError(e.to_string())));

        Ok(text_fragments(bytes).boxed())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

struct FragmentState {
    bytes: BoxStream<'static, Result<Bytes>>,
    parser: SseParser,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

/// Turn a raw SSE byte stream into answer text fragments
///
/// The stream ends after the first error.
pub fn text_fragments<S>(bytes: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    let state = FragmentState {
        bytes: bytes.boxed(),
        parser: SseParser::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.finished = true;
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            let events = match state.bytes.next().await {
                Some(Ok(chunk)) => match state.parser.add_bytes(&chunk) {
                    Ok(events) => events,
                    Err(e) => {
                        state.finished = true;
                        return Some((Err(e), state));
                    }
                },
                Some(Err(e)) => {
                    warn!(error = %e, "Generation stream interrupted");
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    state.parser.finish().into_iter().collect()
                }
            };

            for data in events {
                let item = event_text(&state.parser, &data);
                match item {
                    Ok(text) if text.is_empty() => {}
                    other => state.pending.push_back(other),
                }
            }
        }
    })
}

fn event_text(parser: &SseParser, data: &str) -> Result<String> {
    let response = parser.parse_response(data)?;
    if let Some(reason) = response.block_reason() {
        return Err(RagError::GenerationApiError(format!(
            "Prompt blocked: {}",
            reason
        )));
    }
    Ok(response.text())
}
