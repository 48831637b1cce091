//! # State Actor
//!
//! The single serialized owner of all relay metadata.
//!
//! Every operation takes the actor's lock, garbage-collects, applies its
//! mutation to a working copy of the state, persists that copy, and only
//! then installs it. No two operations observe each other mid-flight,
//! and a failed persist leaves the in-memory state untouched.
//!
//! `claim` is the linearization point for the one-shot guarantee: the
//! flip to `claimed` is persisted before the call returns, so of any
//! number of concurrent claims for one token exactly one succeeds.
//!
//! Removal paths (abort, finalize, overwrite eviction, TTL expiry,
//! stuck-reservation GC, cap eviction) hand the removed object keys to a
//! deletions channel; the blob janitor owned by the service consumes it
//! and deletes the corresponding blobs best-effort.

use crate::config::RelayLimits;
use crate::sanitize::{sanitize_filename, truncate_utf8};
use crate::state_store::{StateStore, StateStoreError};
use crate::token::{generate_token, object_key};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Reservations older than this that never committed are collected.
const STUCK_RESERVED_SECS: i64 = 600;

/// Minimum retention of per-IP rate-limit entries.
const LAST_UPLOAD_RETAIN_SECS: i64 = 86_400;

/// Declared content types are truncated to this many bytes.
const CONTENT_TYPE_MAX_BYTES: usize = 200;

// ============================================================================
// State Model
// ============================================================================

/// Lifecycle state of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Reservation issued; the blob write may still be in progress.
    Reserved,
    /// Blob committed; the token can be claimed exactly once.
    Ready,
    /// Download in progress or finished; terminal until removal.
    Claimed,
}

/// Metadata for one in-flight or ready blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    pub token: String,
    pub object_key: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub created_at: i64,
    /// `created_at + ttl`, or zero for tokens that never expire.
    pub expires_at: i64,
    pub status: TokenStatus,
    pub uploader_ip: String,
}

/// Monotonic counters surviving restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub hc_count: u64,
}

/// The full persisted state of the relay.
///
/// Invariants maintained by every actor operation:
/// - a token is in `tokens` iff it is in `queue` (exactly once)
/// - `by_name` binds a filename to at most one live (`reserved` or
///   `ready`) token, and that token's `filename` matches the binding
/// - `queue` is ordered oldest-first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayState {
    pub tokens: HashMap<String, TokenMeta>,
    pub by_name: HashMap<String, String>,
    pub queue: Vec<String>,
    pub last_upload: HashMap<String, i64>,
    pub metrics: Metrics,
}

// ============================================================================
// Operation Payloads
// ============================================================================

/// Input to `reserve`.
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub ip: String,
    /// API key as submitted by the client, if any.
    pub key: Option<String>,
    /// Raw (unsanitized) filename.
    pub filename: String,
    /// Declared byte length.
    pub size: u64,
    pub content_type: String,
}

/// Successful `reserve` outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub token: String,
    pub object_key: String,
    /// The sanitized filename the download URL must carry.
    pub filename: String,
}

/// Successful `claim` outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedBlob {
    pub object_key: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
}

/// Health counters returned by `health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub hc_count: u64,
    /// Tokens not yet claimed.
    pub pending_tokens: u64,
    /// Declared bytes of those tokens.
    pub pending_bytes: u64,
}

/// Structured failure of a state actor operation.
///
/// The actor never panics across its boundary; every op returns either a
/// success payload or one of these. `NotFound` deliberately covers every
/// resource miss — unknown token, wrong filename, expired, not ready,
/// unsanitizable upload name — so callers can render one opaque 404.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("not found")]
    NotFound,

    #[error("unauthorized")]
    Unauthorized,

    #[error("too many requests")]
    TooManyRequests,

    /// Persistence failed; the operation did not take effect.
    #[error(transparent)]
    Store(#[from] StateStoreError),
}

// ============================================================================
// State Actor
// ============================================================================

/// Serialized owner of the relay state.
pub struct StateActor {
    state: Mutex<RelayState>,
    store: Arc<dyn StateStore>,
    limits: RelayLimits,
    deletions: mpsc::UnboundedSender<String>,
}

impl StateActor {
    /// Load persisted state (if any) and build the actor.
    pub async fn load(
        store: Arc<dyn StateStore>,
        limits: RelayLimits,
        deletions: mpsc::UnboundedSender<String>,
    ) -> Result<Self, StateStoreError> {
        let state = store.load().await?.unwrap_or_default();
        debug!(
            tokens = state.tokens.len(),
            hc_count = state.metrics.hc_count,
            "state actor loaded"
        );
        Ok(Self {
            state: Mutex::new(state),
            store,
            limits,
            deletions,
        })
    }

    /// The limits this actor enforces.
    pub fn limits(&self) -> &RelayLimits {
        &self.limits
    }

    /// Run one serialized operation: cleanup, mutate, persist, install.
    ///
    /// The working copy is persisted whether the operation succeeds or
    /// fails with a domain error — cleanup and documented error-path
    /// mutations (e.g. expired-on-claim removal) must stick. Only a
    /// persist failure discards the mutation.
    async fn run_op<T>(
        &self,
        op: impl FnOnce(&mut RelayState, i64, &mut Vec<String>) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let mut guard = self.state.lock().await;
        let now = crate::now_secs();

        let mut working = guard.clone();
        let mut removed = Vec::new();
        cleanup_locked(&mut working, &self.limits, now, &mut removed);

        let outcome = op(&mut working, now, &mut removed);

        match self.store.save(&working).await {
            Ok(()) => {
                *guard = working;
                drop(guard);
                for key in removed {
                    let _ = self.deletions.send(key);
                }
                outcome
            }
            Err(save_err) => {
                warn!(error = %save_err, "state persist failed, discarding mutation");
                match outcome {
                    // The op succeeded in memory but never became durable.
                    Ok(_) => Err(StateError::Store(save_err)),
                    Err(domain) => Err(domain),
                }
            }
        }
    }

    /// Reserve a token for an upload.
    ///
    /// Admission checks run in order: API key, per-IP rate limit,
    /// filename sanitization. A prior live token for the same filename
    /// is evicted before the new reservation is inserted.
    pub async fn reserve(&self, request: ReserveRequest) -> Result<Reservation, StateError> {
        let limits = self.limits.clone();
        self.run_op(move |state, now, removed| {
            if let Some(expected) = &limits.api_key {
                if request.key.as_deref() != Some(expected.as_str()) {
                    return Err(StateError::Unauthorized);
                }
            }

            if limits.rate_limit_sec > 0 {
                if let Some(last) = state.last_upload.get(&request.ip) {
                    if now - *last < limits.rate_limit_sec {
                        return Err(StateError::TooManyRequests);
                    }
                }
            }
            state.last_upload.insert(request.ip.clone(), now);

            // An unusable filename renders as the same opaque 404 as any
            // other miss; uploaders get no oracle for the rejection.
            let filename = sanitize_filename(&request.filename).ok_or(StateError::NotFound)?;

            let token = generate_token();
            let key = object_key(&token, &filename);

            if let Some(prior) = state.by_name.get(&filename).cloned() {
                remove_token(state, &prior, removed);
            }

            let content_type =
                truncate_utf8(&request.content_type, CONTENT_TYPE_MAX_BYTES).to_string();
            let meta = TokenMeta {
                token: token.clone(),
                object_key: key.clone(),
                filename: filename.clone(),
                content_type,
                size: request.size,
                created_at: now,
                expires_at: if limits.ttl_sec > 0 {
                    now + limits.ttl_sec
                } else {
                    0
                },
                status: TokenStatus::Reserved,
                uploader_ip: request.ip.clone(),
            };

            state.tokens.insert(token.clone(), meta);
            state.by_name.insert(filename.clone(), token.clone());
            state.queue.push(token.clone());
            enforce_cap(state, &limits, removed);

            debug!(token = %token, filename = %filename, "reserved");
            Ok(Reservation {
                token,
                object_key: key,
                filename,
            })
        })
        .await
    }

    /// Flip a reservation to `ready` after its blob write succeeded.
    ///
    /// Idempotent for tokens already past `reserved`.
    pub async fn commit(&self, token: &str) -> Result<(), StateError> {
        let limits = self.limits.clone();
        self.run_op(move |state, _now, removed| {
            let meta = state.tokens.get_mut(token).ok_or(StateError::NotFound)?;
            if meta.status == TokenStatus::Reserved {
                meta.status = TokenStatus::Ready;
                enforce_cap(state, &limits, removed);
            }
            Ok(())
        })
        .await
    }

    /// Drop a reservation whose blob write failed. Idempotent.
    pub async fn abort(&self, token: &str) -> Result<(), StateError> {
        self.run_op(move |state, _now, removed| {
            remove_token(state, token, removed);
            Ok(())
        })
        .await
    }

    /// Claim a `ready` token for its one download.
    ///
    /// The filename must match the token's exactly — the URL carries it
    /// as a cheap capability check. The `claimed` flip is persisted
    /// before this returns; concurrent claims of the same token observe
    /// `claimed` and fail.
    pub async fn claim(&self, token: &str, filename: &str) -> Result<ClaimedBlob, StateError> {
        self.run_op(move |state, now, removed| {
            let meta = match state.tokens.get(token) {
                Some(meta) => meta.clone(),
                None => return Err(StateError::NotFound),
            };

            if meta.expires_at > 0 && meta.expires_at <= now {
                remove_token(state, token, removed);
                return Err(StateError::NotFound);
            }

            if meta.status != TokenStatus::Ready || meta.filename != filename {
                return Err(StateError::NotFound);
            }

            if let Some(live) = state.tokens.get_mut(token) {
                live.status = TokenStatus::Claimed;
            }
            // A claimed token no longer binds its filename; a new upload
            // under the same name may begin immediately.
            if state.by_name.get(&meta.filename).map(String::as_str) == Some(token) {
                state.by_name.remove(&meta.filename);
            }

            debug!(token = %token, "claimed");
            Ok(ClaimedBlob {
                object_key: meta.object_key,
                filename: meta.filename,
                content_type: meta.content_type,
                size: meta.size,
            })
        })
        .await
    }

    /// Remove a token after its download finished (or failed). Idempotent.
    pub async fn finalize(&self, token: &str) -> Result<(), StateError> {
        self.run_op(move |state, _now, removed| {
            remove_token(state, token, removed);
            Ok(())
        })
        .await
    }

    /// Run garbage collection on its own.
    ///
    /// Every operation already collects on entry; this exists for the
    /// periodic scheduler tick.
    pub async fn cleanup(&self) -> Result<(), StateError> {
        self.run_op(|_state, _now, _removed| Ok(())).await
    }

    /// Increment and return the health counter with pending totals.
    ///
    /// `claimed` tokens are excluded from the pending counts: their
    /// blobs are already scheduled for deletion.
    pub async fn health(&self) -> Result<HealthSnapshot, StateError> {
        self.run_op(|state, _now, _removed| {
            state.metrics.hc_count += 1;
            let mut pending_tokens = 0u64;
            let mut pending_bytes = 0u64;
            for meta in state.tokens.values() {
                if meta.status != TokenStatus::Claimed {
                    pending_tokens += 1;
                    pending_bytes += meta.size;
                }
            }
            Ok(HealthSnapshot {
                hc_count: state.metrics.hc_count,
                pending_tokens,
                pending_bytes,
            })
        })
        .await
    }
}

// ============================================================================
// Locked Helpers
// ============================================================================

/// Remove a token from every index, recording its object key for
/// deletion. Missing tokens are ignored.
fn remove_token(state: &mut RelayState, token: &str, removed: &mut Vec<String>) {
    if let Some(meta) = state.tokens.remove(token) {
        state.queue.retain(|t| t != token);
        if state.by_name.get(&meta.filename).map(String::as_str) == Some(token) {
            state.by_name.remove(&meta.filename);
        }
        removed.push(meta.object_key);
    }
}

/// Evict the oldest `ready` tokens until at most `max_pending` remain.
fn enforce_cap(state: &mut RelayState, limits: &RelayLimits, removed: &mut Vec<String>) {
    if limits.max_pending <= 0 {
        return;
    }
    let cap = limits.max_pending as usize;
    loop {
        let ready: Vec<String> = state
            .queue
            .iter()
            .filter(|t| {
                matches!(state.tokens.get(*t), Some(meta) if meta.status == TokenStatus::Ready)
            })
            .cloned()
            .collect();
        if ready.len() <= cap {
            return;
        }
        remove_token(state, &ready[0], removed);
    }
}

/// Garbage collection run on entry to every operation.
///
/// Removes expired tokens, reservations stuck past the grace window,
/// enforces the pending cap, and prunes stale rate-limit entries.
fn cleanup_locked(state: &mut RelayState, limits: &RelayLimits, now: i64, removed: &mut Vec<String>) {
    let expired: Vec<String> = state
        .tokens
        .values()
        .filter(|meta| meta.expires_at > 0 && meta.expires_at < now)
        .map(|meta| meta.token.clone())
        .collect();
    for token in expired {
        remove_token(state, &token, removed);
    }

    let stuck: Vec<String> = state
        .tokens
        .values()
        .filter(|meta| {
            meta.status == TokenStatus::Reserved && now - meta.created_at > STUCK_RESERVED_SECS
        })
        .map(|meta| meta.token.clone())
        .collect();
    for token in stuck {
        remove_token(state, &token, removed);
    }

    enforce_cap(state, limits, removed);

    let retain = limits.rate_limit_sec.max(LAST_UPLOAD_RETAIN_SECS);
    state.last_upload.retain(|_, at| now - *at <= retain);
}

#[cfg(test)]
#[path = "actor_tests.rs"]
mod tests;
