//! # Drop-Relay Service
//!
//! Wiring for the relay binary: filesystem-backed stores, the blob
//! janitor that consumes the state actor's deletion queue, the periodic
//! cleanup scheduler, and the HTTP server.

use drop_relay_api::{start_server, ApiConfig, AppState, ServiceError};
use drop_relay_core::adapters::filesystem::{FsBlobStore, FsStateStore};
use drop_relay_core::{BlobStore, RelayLimits, StateActor};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runtime options for the relay service.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub listen: SocketAddr,
    pub data_dir: PathBuf,
    pub limits: RelayLimits,
    pub base_path: Option<String>,
    pub public_origin: Option<String>,
    pub cleanup_interval: Duration,
}

/// Assemble the relay and serve until the process exits.
pub async fn run(options: RelayOptions) -> Result<(), ServiceError> {
    options.limits.validate().map_err(ServiceError::Configuration)?;

    let blobs: Arc<dyn BlobStore> = Arc::new(
        FsBlobStore::new(options.data_dir.join("blobs"))
            .await
            .map_err(|e| ServiceError::StorageInit {
                message: e.to_string(),
            })?,
    );
    let state_store = Arc::new(
        FsStateStore::new(&options.data_dir)
            .await
            .map_err(|e| ServiceError::StorageInit {
                message: e.to_string(),
            })?,
    );

    let (deletions_tx, deletions_rx) = mpsc::unbounded_channel();
    let actor = Arc::new(
        StateActor::load(state_store, options.limits, deletions_tx)
            .await
            .map_err(|e| ServiceError::StorageInit {
                message: e.to_string(),
            })?,
    );

    spawn_blob_janitor(deletions_rx, blobs.clone());
    spawn_cleanup_scheduler(actor.clone(), options.cleanup_interval);

    info!(data_dir = %options.data_dir.display(), "relay stores ready");

    let state = AppState {
        actor,
        blobs,
        config: ApiConfig::new(options.base_path.as_deref(), options.public_origin),
    };
    start_server(state, options.listen).await
}

/// Consume the actor's deletion queue and drop blobs best-effort.
///
/// Every token removal — finalize, abort, overwrite eviction, expiry,
/// cap eviction — lands here; a failed delete only logs, the next
/// removal of the same key is a no-op.
pub fn spawn_blob_janitor(
    mut deletions: mpsc::UnboundedReceiver<String>,
    blobs: Arc<dyn BlobStore>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(key) = deletions.recv().await {
            match blobs.delete(&key).await {
                Ok(()) => debug!(key = %key, "blob deleted"),
                Err(err) => warn!(error = %err, key = %key, "blob deletion failed"),
            }
        }
    })
}

/// Fire `cleanup` on the actor at a fixed cadence.
///
/// The cadence is not load-bearing: every actor operation collects on
/// entry anyway. The tick only bounds how long expired state can linger
/// on an otherwise idle relay.
pub fn spawn_cleanup_scheduler(actor: Arc<StateActor>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = actor.cleanup().await {
                warn!(error = %err, "scheduled cleanup failed");
            }
        }
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
