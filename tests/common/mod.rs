//! Shared fakes for integration tests
//!
//! No test here talks to the network: embeddings come from a hashed
//! bag-of-words model and answers from a scripted generator.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use resumebuddy::chunking::SentenceChunker;
use resumebuddy::embedding::{Embedder, EmbeddingProvider, RateLimitPolicy};
use resumebuddy::index::{DurableStorage, EphemeralScopedStorage, IndexStore, SessionIndexCache};
use resumebuddy::models::GenerationConfig;
use resumebuddy::streaming::{GenerationProvider, TextStream};
use resumebuddy::{RagError, Result};

pub const JANE_DOE: &str = "Jane Doe is a senior backend engineer based in Berlin. \
She designed and built a payments system that settles card transactions for small shops. \
On weekends she climbs and bakes sourdough bread.";

pub const PROJECT_NOTES: &str = "The search rewrite moved indexing into a background queue. \
Latency dropped by half after the cache layer shipped.";

/// Embeds text as hashed lowercase word counts
pub struct BagOfWords {
    dimension: usize,
    calls: AtomicUsize,
    fail: bool,
}

impl BagOfWords {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Every call fails like an exhausted quota
    pub fn failing() -> Self {
        Self {
            dimension: 1024,
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn bucket(&self, word: &str) -> usize {
        // FNV-1a
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in word.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        (hash % self.dimension as u64) as usize
    }
}

#[async_trait]
impl EmbeddingProvider for BagOfWords {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RagError::EmbeddingApiError("HTTP 429 Too Many Requests".to_string()));
        }

        let mut vector = vec![0.0; self.dimension];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            vector[self.bucket(&word.to_lowercase())] += 1.0;
        }
        Ok(vector)
    }

    fn model(&self) -> &str {
        "bag-of-words"
    }
}

/// How the scripted generator behaves
#[derive(Clone)]
pub enum Script {
    /// Stream these fragments, then end cleanly
    Fragments(Vec<String>),
    /// Refuse to open the stream
    FailOnOpen(String),
    /// Stream these fragments, then fail
    FailMidStream(Vec<String>, String),
}

/// Generator that records prompts and replays a script
pub struct ScriptedGenerator {
    script: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(fragments: &[&str]) -> Self {
        Self::new(Script::Fragments(
            fragments.iter().map(|f| f.to_string()).collect(),
        ))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGenerator {
    async fn stream_generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<TextStream> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        match &self.script {
            Script::Fragments(fragments) => {
                let items: Vec<Result<String>> = fragments.iter().cloned().map(Ok).collect();
                Ok(stream::iter(items).boxed())
            }
            Script::FailOnOpen(message) => Err(RagError::GenerationApiError(message.clone())),
            Script::FailMidStream(fragments, message) => {
                let mut items: Vec<Result<String>> = fragments.iter().cloned().map(Ok).collect();
                items.push(Err(RagError::StreamingError(message.clone())));
                Ok(stream::iter(items).boxed())
            }
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Scratch workspace holding a corpus directory and index locations
pub struct Workspace {
    pub temp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    pub fn corpus_dir(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.temp.path().join("embeddings.json")
    }

    pub fn ephemeral_dir(&self) -> PathBuf {
        self.temp.path().join("instance")
    }

    /// Write a corpus document
    pub fn add_document(&self, name: &str, text: &str) -> &Self {
        let dir = self.corpus_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(name), text).unwrap();
        self
    }

    /// Store over this workspace with a small chunk budget, so every
    /// sentence of the fixtures is its own chunk
    pub fn store(&self, provider: Arc<dyn EmbeddingProvider>) -> IndexStore {
        self.store_with_budget(provider, 100)
    }

    pub fn store_with_budget(&self, provider: Arc<dyn EmbeddingProvider>, budget: usize) -> IndexStore {
        IndexStore::new(
            SentenceChunker::with_budget(budget),
            Embedder::with_config(provider, 10, RateLimitPolicy::unpaced()),
            Arc::new(SessionIndexCache::new()),
            EphemeralScopedStorage::new(self.ephemeral_dir()),
            DurableStorage::new(self.artifact_path()),
        )
    }
}

pub fn read_to_string(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
