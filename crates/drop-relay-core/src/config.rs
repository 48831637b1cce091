//! # Relay Admission Limits
//!
//! Configuration for the state actor's admission control.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Admission-control limits enforced by the state actor.
///
/// Any limit set to zero or below disables the corresponding check,
/// except `max_mb`, which must stay positive — the relay always has an
/// upload size ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayLimits {
    /// When set, uploads must present this key.
    pub api_key: Option<String>,

    /// Maximum upload size in mebibytes. Must be positive.
    pub max_mb: i64,

    /// Minimum seconds between uploads from one IP.
    pub rate_limit_sec: i64,

    /// Maximum number of `ready` tokens retained; older ones are
    /// evicted FIFO.
    pub max_pending: i64,

    /// Token time-to-live in seconds; zero or below means tokens never
    /// expire.
    pub ttl_sec: i64,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self {
            api_key: None,
            max_mb: 50,
            rate_limit_sec: 10,
            max_pending: 10,
            ttl_sec: 86_400,
        }
    }
}

impl RelayLimits {
    /// Validate the limits for consistency.
    ///
    /// Call once at startup before the service is marked ready.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_mb <= 0 {
            return Err(ConfigError::Invalid {
                message: format!("max_mb must be positive, got {}", self.max_mb),
            });
        }
        Ok(())
    }

    /// Upload size ceiling in bytes.
    pub fn max_bytes(&self) -> u64 {
        self.max_mb as u64 * 1024 * 1024
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
