//! # Drop-Relay Service
//!
//! Binary entry point for the relay.
//!
//! This executable:
//! - Loads configuration from CLI flags and `UD_*` environment variables
//! - Initializes logging
//! - Builds the filesystem-backed stores and the state actor
//! - Starts the cleanup scheduler, blob janitor, and HTTP server

use clap::Parser;
use drop_relay_core::RelayLimits;
use drop_relay_service::{run, RelayOptions};
use drop_relay_api::ServiceError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[clap(name = "drop-relay", about = "One-shot file relay", version)]
struct Args {
    /// Socket address to listen on.
    #[arg(long = "listen", env = "UD_LISTEN", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// Directory for blob bytes and persisted state.
    #[arg(long = "data-dir", env = "UD_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// When set, uploads must present this key.
    #[arg(long = "api-key", env = "UD_API_KEY")]
    api_key: Option<String>,

    /// Base path prefix for all routes.
    #[arg(long = "base-path", env = "UD_BASE_PATH")]
    base_path: Option<String>,

    /// Origin override for generated download URLs.
    #[arg(long = "public-origin", env = "UD_PUBLIC_ORIGIN")]
    public_origin: Option<String>,

    /// Maximum upload size in mebibytes (must be positive).
    #[arg(long = "max-mb", env = "UD_MAX_MB", default_value_t = 50)]
    max_mb: i64,

    /// Minimum seconds between uploads from one IP; zero or below disables.
    #[arg(long = "rate-limit-sec", env = "UD_RATE_LIMIT_SEC", default_value_t = 10)]
    rate_limit_sec: i64,

    /// Maximum retained ready tokens; zero or below disables.
    #[arg(long = "max-pending", env = "UD_MAX_PENDING", default_value_t = 10)]
    max_pending: i64,

    /// Token time-to-live in seconds; zero or below disables expiry.
    #[arg(long = "ttl-sec", env = "UD_TTL_SEC", default_value_t = 86_400)]
    ttl_sec: i64,

    /// Seconds between scheduled cleanup passes.
    #[arg(long = "cleanup-interval-sec", env = "UD_CLEANUP_INTERVAL_SEC", default_value_t = 60)]
    cleanup_interval_sec: u64,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "drop_relay_service=info,drop_relay_api=info,drop_relay_core=info,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("starting drop-relay service");

    let options = RelayOptions {
        listen: args.listen,
        data_dir: args.data_dir,
        limits: RelayLimits {
            api_key: args.api_key,
            max_mb: args.max_mb,
            rate_limit_sec: args.rate_limit_sec,
            max_pending: args.max_pending,
            ttl_sec: args.ttl_sec,
        },
        base_path: args.base_path,
        public_origin: args.public_origin,
        cleanup_interval: Duration::from_secs(args.cleanup_interval_sec.max(1)),
    };

    if let Err(err) = run(options).await {
        error!("failed to start relay: {err}");

        let exit_code = match err {
            ServiceError::BindFailed { .. } => 1,
            ServiceError::ServerFailed { .. } => 2,
            ServiceError::Configuration(_) => 3,
            ServiceError::StorageInit { .. } => 4,
        };
        std::process::exit(exit_code);
    }
}
