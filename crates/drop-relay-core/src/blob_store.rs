//! # Blob Store Interface
//!
//! Abstraction over the opaque bytes store that holds uploaded blobs.
//!
//! The relay treats the store as a plain key-value surface: blobs are
//! written once under an `obj/…` key, read at most once on download,
//! and deleted when their token leaves the state actor. `list` exists
//! only for the health endpoint's usage summary.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata stored alongside blob bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMeta {
    /// Sanitized user-visible filename.
    pub filename: String,

    /// Upload time, epoch seconds rendered as a string.
    pub uploaded_at: String,
}

impl BlobMeta {
    /// Create metadata for a blob uploaded now.
    pub fn new(filename: impl Into<String>, uploaded_at: i64) -> Self {
        Self {
            filename: filename.into(),
            uploaded_at: uploaded_at.to_string(),
        }
    }
}

/// A blob read back from the store.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub data: Bytes,
    pub meta: BlobMeta,
}

/// One entry from a `list` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEntry {
    pub key: String,
    pub size: u64,
}

/// Blob store failures.
///
/// The relay never inspects these beyond logging; a failed `put` aborts
/// the reservation and a failed `get` after claim renders as the same
/// empty 404 as any other miss.
#[derive(Debug, Error)]
pub enum BlobStoreError {
    /// Underlying I/O failure (filesystem, network).
    #[error("blob store I/O failure: {message}")]
    Io { message: String },

    /// Backend rejected the operation or returned malformed data.
    #[error("blob store backend failure: {message}")]
    Backend { message: String },
}

/// Interface for blob storage operations.
///
/// Implementations must tolerate `delete` on missing keys (removal paths
/// are retried and may race) and must return `None` from `get` rather
/// than an error for unknown keys.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store blob bytes under `key`, overwriting any previous object.
    async fn put(&self, key: &str, data: Bytes, meta: BlobMeta) -> Result<(), BlobStoreError>;

    /// Fetch a blob, or `None` when the key is unknown.
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobStoreError>;

    /// Remove a blob. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), BlobStoreError>;

    /// List keys under `prefix` with their sizes.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, BlobStoreError>;
}
