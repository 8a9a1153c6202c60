//! Configuration management for ResumeBuddy
//!
//! Provides TOML-based configuration with defaults, environment overrides
//! and validation.
//! Location: ~/.resumebuddy/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chunking::CHUNK_SIZE;
use crate::embedding::{RateLimitPolicy, DEFAULT_BATCH_SIZE, DEFAULT_EMBED_MODEL};
use crate::errors::{RagError, Result};
use crate::index::cache::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use crate::models::{GenerationConfig, DEFAULT_GEMINI_URL};
use crate::rag::retrieval::DEFAULT_TOP_K;
use crate::streaming::DEFAULT_CHAT_MODEL;

/// Primary API key variable
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Fallback API key variable, checked when the primary one is unset
pub const PUBLIC_API_KEY_VAR: &str = "NEXT_PUBLIC_GEMINI_API_KEY";

/// Embedding model override
pub const EMBED_MODEL_VAR: &str = "GEMINI_EMBED_MODEL";

/// Chat model override
pub const CHAT_MODEL_VAR: &str = "GEMINI_CHAT_MODEL";

/// Complete configuration for ResumeBuddy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

/// Gemini connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub embed_model: String,
    pub chat_model: String,
    pub temperature: f32,
}

/// Embedding batching and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub batch_size: usize,
    pub inter_call_delay_ms: u64,
    pub max_concurrent: usize,
}

/// Chunking, retrieval and index storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub chunk_size: usize,
    pub top_k: usize,
    pub corpus_dir: String,
    pub artifact_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ephemeral_dir: Option<String>,
    pub session_ttl_secs: u64,
    pub max_sessions: usize,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_URL.to_string(),
            api_key: None,
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: GenerationConfig::default().temperature,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            inter_call_delay_ms: policy.inter_call_delay().as_millis() as u64,
            max_concurrent: policy.max_concurrent(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            top_k: DEFAULT_TOP_K,
            corpus_dir: "data".to_string(),
            artifact_path: "embeddings.json".to_string(),
            ephemeral_dir: None,
            session_ttl_secs: DEFAULT_SESSION_TTL.as_secs(),
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl Config {
    /// Load configuration from file or defaults, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(config_path) = path {
            Self::load_from_file(&config_path)?
        } else {
            Self::load_default()?
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".resumebuddy").join("config.toml"))
    }

    /// Override settings from environment variables
    ///
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = lookup(API_KEY_VAR).or_else(|| lookup(PUBLIC_API_KEY_VAR)) {
            self.gemini.api_key = Some(key);
        }
        if let Some(model) = lookup(EMBED_MODEL_VAR) {
            self.gemini.embed_model = model;
        }
        if let Some(model) = lookup(CHAT_MODEL_VAR) {
            self.gemini.chat_model = model;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.gemini.embed_model.trim().is_empty() || self.gemini.chat_model.trim().is_empty() {
            return Err(RagError::ConfigError("model names must not be empty".to_string()));
        }

        if !(0.0..=2.0).contains(&self.gemini.temperature) {
            return Err(RagError::ConfigError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.embedding.batch_size == 0 {
            return Err(RagError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }

        if self.embedding.max_concurrent == 0 {
            return Err(RagError::ConfigError(
                "max_concurrent must be greater than 0".to_string(),
            ));
        }

        if self.index.chunk_size == 0 {
            return Err(RagError::ConfigError(
                "chunk_size must be greater than 0".to_string(),
            ));
        }

        if self.index.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than 0".to_string()));
        }

        if self.index.max_sessions == 0 {
            return Err(RagError::ConfigError(
                "max_sessions must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// API key, or a `ConfigError` naming the variable to set
    pub fn require_api_key(&self) -> Result<&str> {
        match self.gemini.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(RagError::ConfigError(format!(
                "{} environment variable is not set. Get a key from https://aistudio.google.com/",
                API_KEY_VAR
            ))),
        }
    }

    /// Save configuration to file (the API key is never written)
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut persisted = self.clone();
        persisted.gemini.api_key = None;

        let contents = toml::to_string_pretty(&persisted)
            .map_err(|e| RagError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RagError::ConfigError(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| RagError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Embedding pacing policy
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::with_config(
            self.embedding.max_concurrent,
            Duration::from_millis(self.embedding.inter_call_delay_ms),
        )
    }

    /// Generation sampling options
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.gemini.temperature,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.index.session_ttl_secs)
    }

    /// Expand tilde in paths
    pub fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(rest);
            }
        }
        PathBuf::from(path)
    }

    pub fn corpus_dir(&self) -> PathBuf {
        Self::expand_path(&self.index.corpus_dir)
    }

    pub fn artifact_path(&self) -> PathBuf {
        Self::expand_path(&self.index.artifact_path)
    }

    /// Instance-local directory for session indexes, if configured
    pub fn ephemeral_dir(&self) -> Option<PathBuf> {
        self.index.ephemeral_dir.as_deref().map(Self::expand_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.gemini.embed_model, "text-embedding-004");
        assert_eq!(config.gemini.chat_model, "gemini-2.5-flash");
        assert_eq!(config.gemini.temperature, 0.2);
        assert_eq!(config.embedding.batch_size, 10);
        assert_eq!(config.embedding.inter_call_delay_ms, 100);
        assert_eq!(config.embedding.max_concurrent, 1);
        assert_eq!(config.index.chunk_size, 700);
        assert_eq!(config.index.top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[index]\ntop_k = 3\n").unwrap();
        assert_eq!(config.index.top_k, 3);
        assert_eq!(config.index.chunk_size, 700);
        assert_eq!(config.gemini, GeminiConfig::default());
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        let mut config = Config::default();
        config.embedding.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.embedding.max_concurrent = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.index.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_temperature_range() {
        let mut config = Config::default();
        config.gemini.temperature = 2.5;
        assert!(config.validate().is_err());
        config.gemini.temperature = 0.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[
            (API_KEY_VAR, "primary"),
            (PUBLIC_API_KEY_VAR, "public"),
            (CHAT_MODEL_VAR, "gemini-pro"),
        ]));
        assert_eq!(config.require_api_key().unwrap(), "primary");
        assert_eq!(config.gemini.chat_model, "gemini-pro");
        assert_eq!(config.gemini.embed_model, "text-embedding-004");
    }

    #[test]
    fn test_public_key_fallback() {
        let mut config = Config::default();
        config.apply_env_overrides(env(&[(API_KEY_VAR, "  "), (PUBLIC_API_KEY_VAR, "public")]));
        assert_eq!(config.require_api_key().unwrap(), "public");
    }

    #[test]
    fn test_missing_api_key() {
        let config = Config::default();
        match config.require_api_key() {
            Err(RagError::ConfigError(message)) => assert!(message.contains(API_KEY_VAR)),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_save_and_load_without_key() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.gemini.api_key = Some("secret".to_string());
        config.index.top_k = 7;
        config.save(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(!contents.contains("secret"));

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.index.top_k, 7);
        assert!(loaded.gemini.api_key.is_none());
    }

    #[test]
    fn test_expand_path() {
        assert!(!Config::expand_path("~/data").to_string_lossy().contains('~'));
        assert_eq!(Config::expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }
}
