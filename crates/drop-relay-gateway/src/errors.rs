//! Error types for the gateway HTTP surface

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::error;

/// Gateway request failures with HTTP status code mapping.
///
/// Upstream failures are not errors in this taxonomy: they are reported
/// as a structured dispatch result with HTTP 502 so the caller sees
/// both legs' status. These variants cover only what fails before
/// anything is sent upstream.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or unlisted access token.
    ///
    /// Maps to: `401 Unauthorized`.
    #[error("unauthorized")]
    Unauthorized,

    /// Request failed local validation (missing field, bad base64,
    /// out-of-bounds media size, malformed body).
    ///
    /// Maps to: `400 Bad Request`.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Unexpected server-side failure.
    ///
    /// Maps to: `500 Internal Server Error`.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        if let Self::Internal { message } = &self {
            error!(error = %message, "gateway request failed");
        }
        let body = json!({
            "ok": false,
            "error": self.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}
