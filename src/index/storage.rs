//! Index storage capability
//!
//! Three variants behind one trait, tried in priority order by the store:
//! 1. `InMemoryStorage`: session indexes in the process-local cache
//! 2. `EphemeralScopedStorage`: session indexes as files in an instance-local
//!    temp directory (best-effort, gone once the instance is recycled),
//!    bounded by the same TTL and session count as the cache
//! 3. `DurableStorage`: the shared corpus artifact at a well-known path
//!
//! Session-scoped indexes are only ever written to variants 1 and 2; the
//! durable variant refuses them.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::errors::{IndexMissing, RagError, Result};
use crate::index::cache::{CacheLookup, SessionIndexCache, DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};
use crate::types::{Index, SessionId};

/// Which index a caller wants
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexScope {
    /// The pre-built corpus every request may read
    Shared,
    /// Uploaded files of one session
    Session(SessionId),
}

impl fmt::Display for IndexScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexScope::Shared => write!(f, "shared corpus"),
            IndexScope::Session(id) => write!(f, "session {}", id),
        }
    }
}

/// Storage variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    InMemory,
    EphemeralScoped,
    Durable,
}

/// Somewhere an index can be saved to and loaded from
#[async_trait]
pub trait Storage: Send + Sync {
    fn kind(&self) -> StorageKind;

    /// Whether `save` accepts this scope
    fn accepts(&self, scope: &IndexScope) -> bool;

    /// Index visible to `scope`, `None` when this storage has nothing for it
    async fn load(&self, scope: &IndexScope) -> Result<Option<Arc<Index>>>;

    /// Replace the index stored for `scope`
    async fn save(&self, scope: &IndexScope, index: Arc<Index>) -> Result<()>;

    /// Drop whatever this storage holds for `session`
    async fn evict(&self, _session: &SessionId) -> Result<()> {
        Ok(())
    }

    /// Human-readable location, used in logs and diagnostics
    fn describe(&self) -> String;
}

fn expired(session: &SessionId) -> RagError {
    RagError::NotFound(IndexMissing::SessionExpired {
        session: session.clone(),
    })
}

fn refuse(kind: StorageKind, scope: &IndexScope) -> RagError {
    RagError::StorageError(format!(
        "{:?} storage does not accept the {} index",
        kind, scope
    ))
}

/// Write `bytes` to a sibling temp file, then rename over `path`
///
/// Readers see either the previous file or the complete new one.
pub async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RagError::StorageError(format!("invalid path {}", path.display())))?;
    let temp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    tokio::fs::write(&temp_path, bytes).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn read_index(path: &Path) -> Result<Option<Index>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Session indexes held in the process-local cache
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    cache: Arc<SessionIndexCache>,
}

impl InMemoryStorage {
    pub fn new(cache: Arc<SessionIndexCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<SessionIndexCache> {
        &self.cache
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::InMemory
    }

    fn accepts(&self, scope: &IndexScope) -> bool {
        matches!(scope, IndexScope::Session(_))
    }

    /// An entry past its TTL is `NotFound(SessionExpired)`, not a miss
    async fn load(&self, scope: &IndexScope) -> Result<Option<Arc<Index>>> {
        let IndexScope::Session(id) = scope else {
            return Ok(None);
        };
        match self.cache.lookup(id).await {
            CacheLookup::Hit(index) => Ok(Some(index)),
            CacheLookup::Miss => Ok(None),
            CacheLookup::Expired => Err(expired(id)),
        }
    }

    async fn save(&self, scope: &IndexScope, index: Arc<Index>) -> Result<()> {
        match scope {
            IndexScope::Session(id) => {
                self.cache.insert(id.clone(), index).await;
                Ok(())
            }
            IndexScope::Shared => Err(refuse(self.kind(), scope)),
        }
    }

    async fn evict(&self, session: &SessionId) -> Result<()> {
        self.cache.remove(session).await;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("in-memory cache ({} sessions max)", self.cache.max_sessions())
    }
}

/// Session indexes as JSON files in a directory owned by this instance
///
/// Files older than the TTL are expired on read and purged on every save;
/// at most `max_sessions` files are kept (oldest removed first).
#[derive(Debug, Clone)]
pub struct EphemeralScopedStorage {
    dir: PathBuf,
    ttl: Duration,
    max_sessions: usize,
}

impl EphemeralScopedStorage {
    /// Use `dir` for session files, with the default TTL and capacity
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_limits(dir, DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    /// Use `dir` with a custom TTL and capacity (capacity clamped to at least 1)
    pub fn with_limits(dir: impl Into<PathBuf>, ttl: Duration, max_sessions: usize) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Session directory under the system temp dir, shared by runs on this machine
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join("resumebuddy").join("sessions")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn session_path(&self, session: &SessionId) -> Result<PathBuf> {
        if !session.is_path_safe() {
            return Err(RagError::StorageError(format!(
                "session id '{}' cannot be used as a file name",
                session
            )));
        }
        Ok(self.dir.join(format!("index_{}.json", session)))
    }

    fn is_expired(&self, modified: SystemTime) -> bool {
        // a clock set backwards counts as fresh
        modified
            .elapsed()
            .map(|age| age >= self.ttl)
            .unwrap_or(false)
    }

    /// Delete a session's file, if any
    pub async fn remove(&self, session: &SessionId) -> Result<()> {
        remove_if_present(&self.session_path(session)?).await
    }

    /// Delete expired session files, then the oldest ones beyond capacity
    ///
    /// Returns how many files were removed.
    pub async fn purge(&self) -> Result<usize> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut live: Vec<(SystemTime, PathBuf)> = Vec::new();
        let mut removed = 0usize;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_session_file = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("index_") && n.ends_with(".json"))
                .unwrap_or(false);
            if !is_session_file {
                continue;
            }

            let modified = entry.metadata().await?.modified()?;
            if self.is_expired(modified) {
                remove_if_present(&path).await?;
                removed += 1;
            } else {
                live.push((modified, path));
            }
        }

        if live.len() > self.max_sessions {
            live.sort_by_key(|(modified, _)| *modified);
            let excess = live.len() - self.max_sessions;
            for (_, path) in live.into_iter().take(excess) {
                remove_if_present(&path).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "Purged session index files");
        }
        Ok(removed)
    }
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl Storage for EphemeralScopedStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::EphemeralScoped
    }

    fn accepts(&self, scope: &IndexScope) -> bool {
        matches!(scope, IndexScope::Session(_))
    }

    /// A file past the TTL is deleted and reported as `NotFound(SessionExpired)`
    async fn load(&self, scope: &IndexScope) -> Result<Option<Arc<Index>>> {
        let IndexScope::Session(id) = scope else {
            return Ok(None);
        };
        let path = self.session_path(id)?;

        let modified = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata.modified()?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if self.is_expired(modified) {
            remove_if_present(&path).await?;
            return Err(expired(id));
        }

        let index = read_index(&path).await?;
        if index.is_some() {
            debug!(path = %path.display(), "Loaded session index from ephemeral storage");
        }
        Ok(index.map(Arc::new))
    }

    async fn save(&self, scope: &IndexScope, index: Arc<Index>) -> Result<()> {
        let IndexScope::Session(id) = scope else {
            return Err(refuse(self.kind(), scope));
        };
        let path = self.session_path(id)?;
        let json = serde_json::to_vec(index.as_ref())?;
        write_atomically(&path, &json).await?;

        if let Err(e) = self.purge().await {
            warn!(error = %e, dir = %self.dir.display(), "Could not purge old session files");
        }
        Ok(())
    }

    async fn evict(&self, session: &SessionId) -> Result<()> {
        self.remove(session).await
    }

    fn describe(&self) -> String {
        format!("ephemeral directory {}", self.dir.display())
    }
}

/// The shared corpus artifact at a fixed path
#[derive(Debug, Clone)]
pub struct DurableStorage {
    path: PathBuf,
}

impl DurableStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[async_trait]
impl Storage for DurableStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Durable
    }

    fn accepts(&self, scope: &IndexScope) -> bool {
        matches!(scope, IndexScope::Shared)
    }

    /// Every scope may read the shared corpus
    async fn load(&self, _scope: &IndexScope) -> Result<Option<Arc<Index>>> {
        Ok(read_index(&self.path).await?.map(Arc::new))
    }

    async fn save(&self, scope: &IndexScope, index: Arc<Index>) -> Result<()> {
        if !self.accepts(scope) {
            return Err(refuse(self.kind(), scope));
        }
        let json = serde_json::to_vec_pretty(index.as_ref())?;
        write_atomically(&self.path, &json).await
    }

    fn describe(&self) -> String {
        format!("corpus artifact {}", self.path.display())
    }
}
