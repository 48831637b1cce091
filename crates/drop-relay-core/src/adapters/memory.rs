//! # In-Memory Storage Adapters
//!
//! `RwLock`-backed blob and state stores for tests and local development.
//!
//! The state store carries a save-failure toggle so tests can verify
//! that the actor discards mutations when persistence fails.

use crate::actor::RelayState;
use crate::blob_store::{BlobEntry, BlobMeta, BlobStore, BlobStoreError, StoredBlob};
use crate::state_store::{StateStore, StateStoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs, for test assertions.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Whether a key currently exists, for test assertions.
    pub async fn contains(&self, key: &str) -> bool {
        self.blobs.read().await.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Bytes, meta: BlobMeta) -> Result<(), BlobStoreError> {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), StoredBlob { data, meta });
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobStoreError> {
        Ok(self.blobs.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        self.blobs.write().await.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobStoreError> {
        let blobs = self.blobs.read().await;
        let mut entries: Vec<BlobEntry> = blobs
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, blob)| BlobEntry {
                key: key.clone(),
                size: blob.data.len() as u64,
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

/// In-memory state store with save-failure injection.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    state: RwLock<Option<RelayState>>,
    fail_saves: AtomicBool,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-seeded with state, as if a prior process had
    /// persisted it.
    pub fn with_state(state: RelayState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make subsequent `save` calls fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// The last persisted state, for test assertions.
    pub async fn snapshot(&self) -> Option<RelayState> {
        self.state.read().await.clone()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<RelayState>, StateStoreError> {
        Ok(self.state.read().await.clone())
    }

    async fn save(&self, state: &RelayState) -> Result<(), StateStoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StateStoreError::Backend {
                message: "save failure injected".to_string(),
            });
        }
        *self.state.write().await = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
