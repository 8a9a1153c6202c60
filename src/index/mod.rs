//! Index store
//!
//! Builds indexes from the shared corpus or from uploaded files and resolves
//! which index a request may read:
//! - Storage: one capability with in-memory, ephemeral and durable variants
//! - Cache: session-keyed, bounded lifetime, owned by the store
//! - Isolation: session indexes never reach shared storage

pub mod cache;
pub mod storage;
pub mod store;

// Re-export key types
pub use cache::SessionIndexCache;
pub use storage::{
    DurableStorage, EphemeralScopedStorage, InMemoryStorage, IndexScope, Storage, StorageKind,
};
pub use store::IndexStore;
