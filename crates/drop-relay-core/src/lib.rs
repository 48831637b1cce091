//! # Drop-Relay Core
//!
//! Core business logic for the Drop-Relay one-shot file relay.
//!
//! This crate contains the domain logic for the relay: filename
//! sanitization, token generation, the serialized state actor that owns
//! all metadata (token lifecycle, filename index, admission control),
//! and the storage trait abstractions with in-memory and filesystem
//! adapters.
//!
//! ## Architecture
//!
//! The core follows clean architecture principles:
//! - Business logic depends only on trait abstractions
//! - Infrastructure implementations are injected at runtime
//! - All external dependencies are abstracted behind traits
//!
//! The one consistency primitive is the [`StateActor`]: every metadata
//! operation runs under its lock, starts with garbage collection, and
//! ends by persisting the full state atomically. Blob bytes live behind
//! the [`BlobStore`] trait and are only ever written once and deleted
//! once per key.

pub mod actor;
pub mod adapters;
pub mod blob_store;
pub mod config;
pub mod sanitize;
pub mod state_store;
pub mod token;

pub use actor::{
    ClaimedBlob, HealthSnapshot, RelayState, Reservation, ReserveRequest, StateActor, StateError,
    TokenMeta, TokenStatus,
};
pub use blob_store::{BlobEntry, BlobMeta, BlobStore, BlobStoreError, StoredBlob};
pub use config::{ConfigError, RelayLimits};
pub use sanitize::sanitize_filename;
pub use state_store::{StateStore, StateStoreError};
pub use token::{generate_token, object_key, OBJECT_PREFIX};

/// Current wall-clock time as whole seconds since the Unix epoch.
///
/// All relay timestamps (reservation time, expiry, rate-limit tracking)
/// are second-granular epoch values.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
