//! Index store: build, persist and resolve indexes
//!
//! Builds always produce a fresh `Index` and replace whatever the target
//! scope held before. Resolution walks the storages in priority order and
//! stops at the first hit.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::chunking::{source_id_from_name, SentenceChunker};
use crate::embedding::Embedder;
use crate::errors::{IndexMissing, RagError, Result};
use crate::index::cache::SessionIndexCache;
use crate::index::storage::{
    DurableStorage, EphemeralScopedStorage, InMemoryStorage, IndexScope, Storage, StorageKind,
};
use crate::types::{Chunk, Index, SessionId, UploadedFile};

/// Corpus documents are files with these extensions
const CORPUS_EXTENSIONS: &[&str] = &["md", "txt"];

/// Owner of every built index
pub struct IndexStore {
    chunker: SentenceChunker,
    embedder: Embedder,
    storages: Vec<Arc<dyn Storage>>,
    corpus_location: String,
}

impl IndexStore {
    /// Standard resolution order: session cache, ephemeral directory, corpus artifact
    pub fn new(
        chunker: SentenceChunker,
        embedder: Embedder,
        cache: Arc<SessionIndexCache>,
        ephemeral: EphemeralScopedStorage,
        durable: DurableStorage,
    ) -> Self {
        let corpus_location = durable.path().display().to_string();
        let storages: Vec<Arc<dyn Storage>> = vec![
            Arc::new(InMemoryStorage::new(cache)),
            Arc::new(ephemeral),
            Arc::new(durable),
        ];

        Self {
            chunker,
            embedder,
            storages,
            corpus_location,
        }
    }

    /// Build the shared index from every corpus document in `dir` and persist it
    pub async fn build_from_corpus_files(&self, dir: &Path) -> Result<Arc<Index>> {
        let documents = read_corpus_documents(dir).await?;
        info!(
            documents = documents.len(),
            dir = %dir.display(),
            "Building shared corpus index"
        );

        let index = Arc::new(self.build_index(&documents).await?);
        let scope = IndexScope::Shared;
        let mut saved = false;

        for storage in self.storages.iter().filter(|s| s.accepts(&scope)) {
            storage.save(&scope, index.clone()).await?;
            info!(storage = %storage.describe(), chunks = index.len(), "Persisted corpus index");
            saved = true;
        }

        if !saved {
            return Err(RagError::StorageError(
                "no storage accepts the shared corpus index".to_string(),
            ));
        }

        Ok(index)
    }

    /// Build a session-scoped index from uploaded files only
    ///
    /// The result is kept in session-keyed, instance-local storage and is
    /// never written where other sessions can read it.
    pub async fn build_from_uploaded_files(
        &self,
        session: &SessionId,
        files: &[UploadedFile],
    ) -> Result<Arc<Index>> {
        if files.is_empty() {
            return Err(RagError::ValidationError("No files provided".to_string()));
        }

        let documents: Vec<(String, String)> = files
            .iter()
            .map(|f| (f.source_id(), f.content.clone()))
            .collect();

        let index = Arc::new(self.build_index(&documents).await?);
        let scope = IndexScope::Session(session.clone());

        for storage in self.storages.iter().filter(|s| s.accepts(&scope)) {
            match storage.save(&scope, index.clone()).await {
                Ok(()) => {}
                Err(e) if storage.kind() == StorageKind::EphemeralScoped => {
                    warn!(error = %e, storage = %storage.describe(), "Could not keep session index on disk");
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            session = %session,
            files = files.len(),
            chunks = index.len(),
            "Built session index from uploaded files"
        );
        Ok(index)
    }

    /// Resolve the index visible to `scope`
    pub async fn load(&self, scope: &IndexScope) -> Result<Arc<Index>> {
        for storage in &self.storages {
            match storage.load(scope).await {
                Ok(Some(index)) => {
                    // an empty session entry is treated as a miss
                    if index.is_empty() && storage.kind() != StorageKind::Durable {
                        continue;
                    }
                    info!(
                        scope = %scope,
                        storage = %storage.describe(),
                        chunks = index.len(),
                        "Loaded index"
                    );
                    return Ok(index);
                }
                Ok(None) => {}
                Err(RagError::NotFound(IndexMissing::SessionExpired { session })) => {
                    info!(
                        session = %session,
                        storage = %storage.describe(),
                        "Session index expired, discarding"
                    );
                    self.evict_session(&session).await;
                }
                Err(e) if storage.kind() == StorageKind::EphemeralScoped => {
                    warn!(error = %e, "Ephemeral index unreadable, trying next storage");
                }
                Err(e) => return Err(e),
            }
        }

        Err(match scope {
            IndexScope::Shared => IndexMissing::NoCorpus {
                path: self.corpus_location.clone(),
            },
            IndexScope::Session(session) => IndexMissing::SessionExpired {
                session: session.clone(),
            },
        }
        .into())
    }

    /// Remove a session's index from every storage that holds one
    async fn evict_session(&self, session: &SessionId) {
        for storage in &self.storages {
            if let Err(e) = storage.evict(session).await {
                warn!(error = %e, storage = %storage.describe(), "Could not evict session index");
            }
        }
    }

    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    pub fn chunker(&self) -> &SentenceChunker {
        &self.chunker
    }

    /// Storages in resolution order
    pub fn storages(&self) -> &[Arc<dyn Storage>] {
        &self.storages
    }

    /// Chunk and embed `(source, text)` documents into a new index
    async fn build_index(&self, documents: &[(String, String)]) -> Result<Index> {
        let passages: Vec<_> = documents
            .iter()
            .flat_map(|(source, text)| self.chunker.chunk(text, source))
            .collect();

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let chunks = passages
            .into_iter()
            .zip(vectors)
            .map(|(passage, embedding)| Chunk {
                id: passage.id,
                source: passage.source,
                text: passage.text,
                embedding,
            })
            .collect();

        Index::new(chunks)
    }
}

/// Read corpus documents as `(source, text)` pairs, sorted by file name
async fn read_corpus_documents(dir: &Path) -> Result<Vec<(String, String)>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        RagError::StorageError(format!(
            "Failed to read corpus directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_document = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| CORPUS_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if is_document && entry.file_type().await?.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let text = tokio::fs::read_to_string(&path).await?;
        documents.push((source_id_from_name(&name), text));
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingProvider, RateLimitPolicy};
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Two-dimensional embedding: [length, vowel count]
    struct ShapeProvider;

    #[async_trait]
    impl EmbeddingProvider for ShapeProvider {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32 + 1.0])
        }

        fn model(&self) -> &str {
            "shape"
        }
    }

    fn store(temp: &TempDir) -> IndexStore {
        let embedder = Embedder::with_config(Arc::new(ShapeProvider), 10, RateLimitPolicy::unpaced());
        IndexStore::new(
            SentenceChunker::new(),
            embedder,
            Arc::new(SessionIndexCache::new()),
            EphemeralScopedStorage::new(temp.path().join("ephemeral")),
            DurableStorage::new(temp.path().join("embeddings.json")),
        )
    }

    fn write_corpus(temp: &TempDir) -> PathBuf {
        let dir = temp.path().join("data");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("jane.md"), "Jane is an engineer. She likes Rust.").unwrap();
        std::fs::write(dir.join("notes.txt"), "Project notes.").unwrap();
        std::fs::write(dir.join("image.png"), "binary").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_corpus_build_persists_and_loads() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let dir = write_corpus(&temp);

        let built = store.build_from_corpus_files(&dir).await.unwrap();
        assert_eq!(built.sources(), vec!["jane".to_string(), "notes".to_string()]);
        assert!(temp.path().join("embeddings.json").exists());

        let loaded = store.load(&IndexScope::Shared).await.unwrap();
        assert_eq!(loaded.as_ref(), built.as_ref());
    }

    #[tokio::test]
    async fn test_missing_corpus_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        match store.load(&IndexScope::Shared).await {
            Err(RagError::NotFound(IndexMissing::NoCorpus { path })) => {
                assert!(path.ends_with("embeddings.json"));
            }
            other => panic!("unexpected: {:?}", other.map(|i| i.len())),
        }
    }

    #[tokio::test]
    async fn test_session_miss_reports_session_expired() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let scope = IndexScope::Session(SessionId::from("gone"));

        match store.load(&scope).await {
            Err(RagError::NotFound(IndexMissing::SessionExpired { session })) => {
                assert_eq!(session.as_str(), "gone");
            }
            other => panic!("unexpected: {:?}", other.map(|i| i.len())),
        }
    }

    #[tokio::test]
    async fn test_uploaded_files_never_reach_shared_scope() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let session = SessionId::from("s1");
        let files = vec![UploadedFile::new(
            "secret.md",
            "Confidential résumé.",
            crate::types::FileKind::Resume,
        )];

        store.build_from_uploaded_files(&session, &files).await.unwrap();

        assert!(!temp.path().join("embeddings.json").exists());
        assert!(store.load(&IndexScope::Shared).await.is_err());

        let mine = store.load(&IndexScope::Session(session)).await.unwrap();
        assert_eq!(mine.sources(), vec!["secret".to_string()]);
    }

    #[tokio::test]
    async fn test_session_falls_back_to_ephemeral_then_corpus() {
        let temp = TempDir::new().unwrap();
        let session = SessionId::from("s1");
        let files = vec![UploadedFile::new("cv.md", "Built things.", crate::types::FileKind::Resume)];

        store(&temp)
            .build_from_uploaded_files(&session, &files)
            .await
            .unwrap();

        // fresh store = fresh cache, same instance directory
        let restarted = store(&temp);
        let scope = IndexScope::Session(session.clone());
        let found = restarted.load(&scope).await.unwrap();
        assert_eq!(found.sources(), vec!["cv".to_string()]);

        // nothing on disk for another session: falls through to the corpus
        let dir = write_corpus(&temp);
        restarted.build_from_corpus_files(&dir).await.unwrap();
        let other = IndexScope::Session(SessionId::from("other"));
        let fallback = restarted.load(&other).await.unwrap();
        assert_eq!(fallback.sources(), vec!["jane".to_string(), "notes".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_is_not_served_from_disk() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let session = SessionId::from("s1");
        let files = vec![UploadedFile::new("secret.md", "Private notes.", crate::types::FileKind::Resume)];

        store.build_from_uploaded_files(&session, &files).await.unwrap();
        let file = temp.path().join("ephemeral").join("index_s1.json");
        assert!(file.exists());

        tokio::time::advance(Duration::from_secs(3600)).await;

        let scope = IndexScope::Session(session);
        assert!(matches!(
            store.load(&scope).await,
            Err(RagError::NotFound(IndexMissing::SessionExpired { .. }))
        ));
        assert!(!file.exists());

        // with a corpus present the expired session reads the corpus instead
        let dir = write_corpus(&temp);
        store.build_from_corpus_files(&dir).await.unwrap();
        let fallback = store.load(&scope).await.unwrap();
        assert_eq!(fallback.sources(), vec!["jane".to_string(), "notes".to_string()]);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_wholesale() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let session = SessionId::from("s1");
        let scope = IndexScope::Session(session.clone());

        let first = vec![UploadedFile::new("a.md", "Alpha.", crate::types::FileKind::Resume)];
        let second = vec![UploadedFile::new("b.md", "Beta.", crate::types::FileKind::Project)];

        store.build_from_uploaded_files(&session, &first).await.unwrap();
        store.build_from_uploaded_files(&session, &second).await.unwrap();

        assert_eq!(store.load(&scope).await.unwrap().sources(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_upload_list_is_rejected() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let result = store.build_from_uploaded_files(&SessionId::from("s1"), &[]).await;
        assert!(matches!(result, Err(RagError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_missing_corpus_directory() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let result = store.build_from_corpus_files(&temp.path().join("nope")).await;
        assert!(matches!(result, Err(RagError::StorageError(_))));
    }
}
