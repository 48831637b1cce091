//! # Drop-Relay Gateway
//!
//! HTTP gateway mapping three simple request shapes onto the chat
//! webhook upstream's envelope format.
//!
//! Clients POST raw text, structured JSON, or a multipart form to `/`;
//! the gateway normalizes the request into a typed message, builds the
//! upstream envelope, and dispatches it — one HTTP call for most kinds,
//! an upload+send pair for file bytes. The response always carries the
//! upstream's status and `errcode`/`errmsg` verbatim: HTTP 200 when the
//! upstream accepted the message, 502 when any leg failed.

pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod errors;
pub mod message;

use axum::{
    body::to_bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Query, Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::GatewayConfig;
pub use dispatch::{DispatchReport, Dispatcher};
pub use errors::GatewayError;
pub use message::Message;

/// Request body ceiling: the media limit plus multipart overhead.
const BODY_LIMIT: usize = (message::MAX_MEDIA_BYTES as usize) + 1024 * 1024;

// ============================================================================
// Application State
// ============================================================================

/// Shared gateway state.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub dispatcher: Arc<Dispatcher>,
}

impl GatewayState {
    pub fn new(config: GatewayConfig) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(config.clone()));
        Self {
            config: Arc::new(config),
            dispatcher,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create the gateway router: one endpoint, `POST /`.
pub fn create_router(state: GatewayState) -> Router {
    Router::new()
        .route("/", post(handle_message))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// Bind and serve the gateway until the process exits.
pub async fn start_server(state: GatewayState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "gateway listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============================================================================
// Handler
// ============================================================================

async fn handle_message(
    State(state): State<GatewayState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let token = bearer_token(&headers)
        .or_else(|| params.get("token").cloned())
        .or_else(|| params.get("access_token").cloned());
    if !state.config.token_allowed(token.as_deref()) {
        return GatewayError::Unauthorized.into_response();
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let normalized = if content_type.starts_with("application/json") {
        json_message(request).await
    } else if content_type.starts_with("multipart/form-data") {
        multipart_message(&params, request).await
    } else {
        raw_text_message(&params, request).await
    };

    let message = match normalized {
        Ok(message) => message,
        Err(err) => return err.into_response(),
    };

    match state.dispatcher.dispatch(message).await {
        Ok(report) => {
            let status = if report.ok {
                StatusCode::OK
            } else {
                StatusCode::BAD_GATEWAY
            };
            (status, Json(report)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// `application/json` body: structured descriptor keyed by `type`.
async fn json_message(request: Request) -> Result<Message, GatewayError> {
    let bytes = read_body(request).await?;
    let value: Value = serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::validation(format!("invalid JSON: {e}")))?;
    message::from_json(&value)
}

/// Multipart form: file bytes, with `type=image` switching the payload
/// onto the inline image channel instead of the media upload.
async fn multipart_message(
    params: &HashMap<String, String>,
    request: Request,
) -> Result<Message, GatewayError> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| GatewayError::validation(e.to_string()))?;

    let mut file: Option<(String, String, Bytes)> = None;
    let mut kind = params.get("type").cloned();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::validation(format!("unreadable multipart body: {e}")))?
    {
        match field.name() {
            Some("file") | Some("media") => {
                let filename = field
                    .file_name()
                    .unwrap_or("upload.bin")
                    .to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| GatewayError::validation(format!("unreadable file field: {e}")))?;
                file = Some((filename, content_type, data));
            }
            Some("type") => {
                if let Ok(value) = field.text().await {
                    let value = value.trim().to_string();
                    if !value.is_empty() {
                        kind = Some(value);
                    }
                }
            }
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    let (filename, content_type, data) =
        file.ok_or_else(|| GatewayError::validation("missing file field"))?;

    if kind.as_deref() == Some("image") {
        Ok(message::image_from_upload(&data))
    } else {
        message::file_from_upload(filename, content_type, data)
    }
}

/// Anything else is raw text; the kind comes from the query string.
async fn raw_text_message(
    params: &HashMap<String, String>,
    request: Request,
) -> Result<Message, GatewayError> {
    let bytes = read_body(request).await?;
    let text = String::from_utf8(bytes.to_vec())
        .map_err(|_| GatewayError::validation("body is not valid UTF-8"))?;
    message::from_text(&text, params.get("type").map(String::as_str))
}

async fn read_body(request: Request) -> Result<Bytes, GatewayError> {
    to_bytes(request.into_body(), BODY_LIMIT)
        .await
        .map_err(|e| GatewayError::validation(format!("failed to read body: {e}")))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
