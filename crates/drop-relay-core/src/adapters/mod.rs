//! # Storage Adapters
//!
//! Concrete implementations of the [`BlobStore`](crate::blob_store::BlobStore)
//! and [`StateStore`](crate::state_store::StateStore) traits.
//!
//! - [`memory`] — `RwLock`-backed stores for tests and local development
//! - [`filesystem`] — `tokio::fs` stores for single-node deployments

pub mod filesystem;
pub mod memory;

pub use filesystem::{FsBlobStore, FsStateStore};
pub use memory::{MemoryBlobStore, MemoryStateStore};
