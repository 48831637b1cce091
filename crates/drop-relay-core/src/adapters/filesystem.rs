//! # Filesystem Storage Adapters
//!
//! Local filesystem implementations of the storage traits for
//! single-node deployments.
//!
//! Blobs are stored as raw byte files with a JSON metadata sidecar;
//! the actor state is one JSON document written via a temp file and
//! rename so a crashed save never corrupts the previous state.

use crate::actor::RelayState;
use crate::blob_store::{BlobEntry, BlobMeta, BlobStore, BlobStoreError, StoredBlob};
use crate::state_store::{StateStore, StateStoreError};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Sidecar suffix for blob metadata files.
const META_SUFFIX: &str = ".meta.json";

/// Filename of the persisted actor state document.
const STATE_FILE: &str = "data.json";

fn io_blob_err(context: &str, err: std::io::Error) -> BlobStoreError {
    BlobStoreError::Io {
        message: format!("{context}: {err}"),
    }
}

fn io_state_err(context: &str, err: std::io::Error) -> StateStoreError {
    StateStoreError::Io {
        message: format!("{context}: {err}"),
    }
}

// ============================================================================
// Blob Store
// ============================================================================

/// Filesystem-backed blob store.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    /// Create the store, verifying or creating its base directory.
    pub async fn new(base_path: PathBuf) -> Result<Self, BlobStoreError> {
        fs::create_dir_all(&base_path)
            .await
            .map_err(|e| io_blob_err("failed to create base directory", e))?;
        Ok(Self { base_path })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}{META_SUFFIX}"))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: Bytes, meta: BlobMeta) -> Result<(), BlobStoreError> {
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_blob_err("failed to create blob directory", e))?;
        }

        fs::write(&path, &data)
            .await
            .map_err(|e| io_blob_err("failed to write blob", e))?;

        let encoded = serde_json::to_vec(&meta).map_err(|e| BlobStoreError::Backend {
            message: format!("failed to encode blob metadata: {e}"),
        })?;
        fs::write(self.meta_path(key), encoded)
            .await
            .map_err(|e| io_blob_err("failed to write blob metadata", e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobStoreError> {
        let data = match fs::read(self.blob_path(key)).await {
            Ok(data) => Bytes::from(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_blob_err("failed to read blob", e)),
        };

        let meta = match fs::read(self.meta_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw).map_err(|e| BlobStoreError::Backend {
                message: format!("failed to decode blob metadata: {e}"),
            })?,
            // Bytes without a sidecar still stream; the filename in
            // token metadata is authoritative anyway.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BlobMeta::new("", 0),
            Err(e) => return Err(io_blob_err("failed to read blob metadata", e)),
        };

        Ok(Some(StoredBlob { data, meta }))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobStoreError> {
        for path in [self.blob_path(key), self.meta_path(key)] {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(io_blob_err("failed to delete blob", e)),
            }
        }
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobStoreError> {
        let dir = self.base_path.join(prefix.trim_end_matches('/'));
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_blob_err("failed to list blobs", e)),
        };

        let key_prefix = if prefix.ends_with('/') || prefix.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| io_blob_err("failed to list blobs", e))?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(META_SUFFIX) {
                continue;
            }
            let metadata = entry
                .metadata()
                .await
                .map_err(|e| io_blob_err("failed to stat blob", e))?;
            if !metadata.is_file() {
                continue;
            }
            entries.push(BlobEntry {
                key: format!("{key_prefix}{name}"),
                size: metadata.len(),
            });
        }
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }
}

// ============================================================================
// State Store
// ============================================================================

/// Filesystem-backed state store.
///
/// The full state is one JSON document; saves write a temp file next to
/// it and rename over the old document.
#[derive(Debug, Clone)]
pub struct FsStateStore {
    state_path: PathBuf,
}

impl FsStateStore {
    /// Create the store, verifying or creating its base directory.
    pub async fn new(base_path: &Path) -> Result<Self, StateStoreError> {
        fs::create_dir_all(base_path)
            .await
            .map_err(|e| io_state_err("failed to create base directory", e))?;
        Ok(Self {
            state_path: base_path.join(STATE_FILE),
        })
    }
}

#[async_trait]
impl StateStore for FsStateStore {
    async fn load(&self) -> Result<Option<RelayState>, StateStoreError> {
        let raw = match fs::read(&self.state_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_state_err("failed to read state", e)),
        };
        let state = serde_json::from_slice(&raw).map_err(|e| StateStoreError::Backend {
            message: format!("failed to decode state: {e}"),
        })?;
        Ok(Some(state))
    }

    async fn save(&self, state: &RelayState) -> Result<(), StateStoreError> {
        let encoded = serde_json::to_vec(state).map_err(|e| StateStoreError::Backend {
            message: format!("failed to encode state: {e}"),
        })?;

        let tmp_path = self.state_path.with_extension("json.tmp");
        fs::write(&tmp_path, &encoded)
            .await
            .map_err(|e| io_state_err("failed to write state temp file", e))?;
        fs::rename(&tmp_path, &self.state_path)
            .await
            .map_err(|e| io_state_err("failed to install state file", e))?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;
