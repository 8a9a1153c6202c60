//! Session-keyed index cache
//!
//! Holds uploaded-file indexes for the lifetime of this process, one entry
//! per session. Entries expire after a TTL and the cache never holds more
//! than `max_sessions` entries (oldest evicted first).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::types::{Index, SessionId};

/// Default entry lifetime (30 minutes)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Default maximum number of cached sessions
pub const DEFAULT_MAX_SESSIONS: usize = 64;

/// Outcome of a cache lookup
#[derive(Debug, Clone)]
pub enum CacheLookup {
    Hit(Arc<Index>),
    /// The session was cached but outlived the TTL
    Expired,
    Miss,
}

#[derive(Debug)]
struct CacheEntry {
    index: Arc<Index>,
    inserted_at: Instant,
}

/// In-process cache of session indexes
#[derive(Debug)]
pub struct SessionIndexCache {
    entries: RwLock<HashMap<SessionId, CacheEntry>>,
    ttl: Duration,
    max_sessions: usize,
}

impl Default for SessionIndexCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionIndexCache {
    /// Create cache with default TTL and capacity
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }

    /// Create cache with custom TTL and capacity (capacity clamped to at least 1)
    pub fn with_limits(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            max_sessions: max_sessions.max(1),
        }
    }

    /// Index cached for this session, if present and not expired
    pub async fn get(&self, session: &SessionId) -> Option<Arc<Index>> {
        match self.lookup(session).await {
            CacheLookup::Hit(index) => Some(index),
            CacheLookup::Expired | CacheLookup::Miss => None,
        }
    }

    /// Like [`get`](Self::get), but tells an expired entry apart from a miss
    ///
    /// An expired entry is dropped; later lookups report `Miss`.
    pub async fn lookup(&self, session: &SessionId) -> CacheLookup {
        {
            let entries = self.entries.read().await;
            match entries.get(session) {
                Some(entry) if entry.inserted_at.elapsed() < self.ttl => {
                    return CacheLookup::Hit(entry.index.clone());
                }
                Some(_) => {}
                None => return CacheLookup::Miss,
            }
        }

        self.entries.write().await.remove(session);
        CacheLookup::Expired
    }

    /// Store or replace the index for a session
    pub async fn insert(&self, session: SessionId, index: Arc<Index>) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);

        if !entries.contains_key(&session) && entries.len() >= self.max_sessions {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            session,
            CacheEntry {
                index,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Forget a session, returning whether it was cached
    pub async fn remove(&self, session: &SessionId) -> bool {
        self.entries.write().await.remove(session).is_some()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Chunk;

    fn index_for(source: &str) -> Arc<Index> {
        Arc::new(
            Index::new(vec![Chunk {
                id: format!("{}-1", source),
                source: source.to_string(),
                text: "text".to_string(),
                embedding: vec![1.0],
            }])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let cache = SessionIndexCache::new();
        let alice = SessionId::from("alice");
        let bob = SessionId::from("bob");

        cache.insert(alice.clone(), index_for("alice-cv")).await;

        assert!(cache.get(&bob).await.is_none());
        let found = cache.get(&alice).await.unwrap();
        assert_eq!(found.sources(), vec!["alice-cv".to_string()]);
    }

    #[tokio::test]
    async fn test_insert_replaces_wholesale() {
        let cache = SessionIndexCache::new();
        let session = SessionId::from("s1");

        cache.insert(session.clone(), index_for("old")).await;
        cache.insert(session.clone(), index_for("new")).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.get(&session).await.unwrap().sources(), vec!["new".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = SessionIndexCache::with_limits(Duration::from_secs(60), 8);
        let session = SessionId::from("s1");
        cache.insert(session.clone(), index_for("cv")).await;

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(cache.get(&session).await.is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.get(&session).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_reports_expiry_once() {
        let cache = SessionIndexCache::with_limits(Duration::from_secs(60), 8);
        let session = SessionId::from("s1");
        cache.insert(session.clone(), index_for("cv")).await;

        assert!(matches!(cache.lookup(&session).await, CacheLookup::Hit(_)));
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(matches!(cache.lookup(&session).await, CacheLookup::Expired));
        assert!(matches!(cache.lookup(&session).await, CacheLookup::Miss));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest() {
        let cache = SessionIndexCache::with_limits(Duration::from_secs(600), 2);

        cache.insert(SessionId::from("a"), index_for("a")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert(SessionId::from("b"), index_for("b")).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.insert(SessionId::from("c"), index_for("c")).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&SessionId::from("a")).await.is_none());
        assert!(cache.get(&SessionId::from("b")).await.is_some());
        assert!(cache.get(&SessionId::from("c")).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = SessionIndexCache::with_limits(Duration::from_secs(10), 8);
        cache.insert(SessionId::from("a"), index_for("a")).await;
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.insert(SessionId::from("b"), index_for("b")).await;

        // "a" already dropped by the insert above
        assert_eq!(cache.purge_expired().await, 0);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let cache = SessionIndexCache::new();
        let session = SessionId::from("s1");
        cache.insert(session.clone(), index_for("cv")).await;
        assert!(cache.remove(&session).await);
        assert!(!cache.remove(&session).await);
    }
}
