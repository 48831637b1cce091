//! Error types for the relay HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use drop_relay_core::StateError;
use tracing::error;

/// Relay request failures with HTTP status code mapping.
///
/// The download path collapses every miss into `NotFound`, which renders
/// as a 404 with an empty body — unknown token, wrong filename, expired,
/// and already-claimed are indistinguishable from a route that never
/// existed. Upload-path errors are informative because the uploader is
/// cooperating.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Resource miss of any kind.
    ///
    /// Maps to: `404 Not Found` with an empty body, always.
    #[error("not found")]
    NotFound,

    /// Missing or wrong API key on upload.
    ///
    /// Maps to: `401 Unauthorized`.
    #[error("unauthorized")]
    Unauthorized,

    /// Per-IP upload rate limit tripped.
    ///
    /// Maps to: `429 Too Many Requests`.
    #[error("rate limited")]
    RateLimited,

    /// Streamed PUT without a `Content-Length`.
    ///
    /// Maps to: `411 Length Required`.
    #[error("length required")]
    LengthRequired,

    /// Declared or observed size above the configured ceiling.
    ///
    /// Maps to: `413 Payload Too Large`.
    #[error("file too large: {size} bytes (max: {max_bytes} bytes)")]
    PayloadTooLarge { size: u64, max_bytes: u64 },

    /// Malformed upload (unreadable multipart, missing `file` field).
    ///
    /// Maps to: `400 Bad Request`.
    #[error("bad request: {message}")]
    BadRequest { message: String },

    /// Blob store `put` failed; the reservation is aborted best-effort.
    ///
    /// Maps to: `500 Internal Server Error`.
    #[error("storage failure: {message}")]
    Storage { message: String },

    /// Unexpected server-side failure.
    ///
    /// Maps to: `500 Internal Server Error`.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    /// Status code this error renders as.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::LengthRequired => StatusCode::LENGTH_REQUIRED,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Storage { .. } | Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// One-line message for CLI clients and the HTML form's error slot.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound => String::new(),
            Self::Unauthorized => "unauthorized\n".to_string(),
            Self::RateLimited => "rate limited, slow down\n".to_string(),
            Self::LengthRequired => "Content-Length required\n".to_string(),
            Self::PayloadTooLarge { max_bytes, .. } => {
                format!("file too large (max {} MB)\n", max_bytes / (1024 * 1024))
            }
            Self::BadRequest { message } => format!("bad request: {message}\n"),
            Self::Storage { .. } | Self::Internal { .. } => "upload failed\n".to_string(),
        }
    }
}

impl From<StateError> for ApiError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::NotFound => Self::NotFound,
            StateError::Unauthorized => Self::Unauthorized,
            StateError::TooManyRequests => Self::RateLimited,
            StateError::Store(e) => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage { message } | Self::Internal { message } = &self {
            error!(error = %message, "relay request failed");
        }
        match self {
            // Uniform opacity: no body, no hint.
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            other => (other.status(), other.message()).into_response(),
        }
    }
}

/// The one opaque failure shape for the download path and unknown routes.
pub fn empty_not_found() -> Response {
    StatusCode::NOT_FOUND.into_response()
}

/// Server startup failures.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to bind {addr}: {message}")]
    BindFailed { addr: String, message: String },

    #[error("server failed: {message}")]
    ServerFailed { message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] drop_relay_core::ConfigError),

    #[error("storage initialization failed: {message}")]
    StorageInit { message: String },
}
