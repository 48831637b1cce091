//! # State Store Interface
//!
//! Persistence seam for the state actor.
//!
//! The actor's entire state — tokens, filename index, queue, rate-limit
//! map, health counter — is persisted as one document under a single
//! logical `data` key. Saves happen inside the actor's critical section,
//! so implementations never see concurrent writes.

use crate::actor::RelayState;
use async_trait::async_trait;
use thiserror::Error;

/// State store failures.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// Underlying I/O failure (filesystem, network).
    #[error("state store I/O failure: {message}")]
    Io { message: String },

    /// Backend rejected the operation or returned malformed data.
    #[error("state store backend failure: {message}")]
    Backend { message: String },
}

/// Interface for persisting the full actor state.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the persisted state, or `None` on first start.
    async fn load(&self) -> Result<Option<RelayState>, StateStoreError>;

    /// Persist the full state atomically.
    ///
    /// A successful return means a subsequent `load` observes exactly
    /// this state; on failure the previous persisted state must remain
    /// readable.
    async fn save(&self, state: &RelayState) -> Result<(), StateStoreError>;
}
