//! # Drop-Relay HTTP Service
//!
//! HTTP surface for the one-shot file relay.
//!
//! This crate provides:
//! - Upload intake in three shapes (multipart form, streamed PUT, raw text)
//! - The one-shot download endpoint
//! - Health and help endpoints
//!
//! The handlers are stateless: every admission decision is made by the
//! state actor in `drop-relay-core`, and blob bytes only move between
//! the request body and the blob store. Anything outside the route
//! table — and every miss on the download path — renders as a 404 with
//! an empty body, so unknown URLs and spent tokens are
//! indistinguishable.

pub mod errors;
pub mod intake;
pub mod render;

use axum::{
    body::to_bytes,
    extract::{DefaultBodyLimit, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, put},
    Router,
};
use bytes::Bytes;
use drop_relay_core::{
    now_secs, sanitize_filename, BlobMeta, BlobStore, ReserveRequest, StateActor, StateError,
    OBJECT_PREFIX,
};
use serde::Serialize;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use errors::{ApiError, ServiceError};
use errors::empty_not_found;
use intake::{
    client_ip, collect_multipart, random_fallback_name, resolve_put_filename, submitted_key,
    timestamp_text_name,
};
use render::{
    content_disposition, detect_client, download_url, health_html, help_html, help_text,
    request_origin, upload_form, upload_success_html, upload_success_text, ClientKind,
};

// ============================================================================
// Application State
// ============================================================================

/// Presentation-layer configuration.
#[derive(Debug, Clone, Default)]
pub struct ApiConfig {
    /// Normalized base path prefix (`""` or `"/prefix"`).
    pub base_path: String,

    /// Origin override for generated download URLs.
    pub public_origin: Option<String>,
}

impl ApiConfig {
    pub fn new(base_path: Option<&str>, public_origin: Option<String>) -> Self {
        Self {
            base_path: normalize_base_path(base_path),
            public_origin,
        }
    }
}

/// Normalize a configured base path to `""` or `"/prefix"`.
pub fn normalize_base_path(raw: Option<&str>) -> String {
    match raw {
        None => String::new(),
        Some(path) => {
            let trimmed = path.trim().trim_matches('/');
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("/{trimmed}")
            }
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Serialized owner of all relay metadata.
    pub actor: Arc<StateActor>,

    /// Opaque bytes store for blob payloads.
    pub blobs: Arc<dyn BlobStore>,

    /// Presentation configuration.
    pub config: ApiConfig,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub hc_count: u64,
    pub pending_tokens: u64,
    pub pending_bytes: u64,
    pub store_objects: u64,
    pub store_bytes: u64,
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create the relay router.
///
/// Routes live under the configured base path; everything else falls
/// through to the empty 404.
pub fn create_router(state: AppState) -> Router {
    // Leave headroom above the upload ceiling so the limit check in the
    // handler fires before the body limit does.
    let body_limit = state.actor.limits().max_bytes() as usize + 64 * 1024;

    let routes = Router::new()
        .route("/hc", get(handle_health))
        .route("/hp", get(handle_help))
        .route(
            "/ud",
            get(handle_upload_page)
                .post(handle_upload_post)
                .put(handle_upload_put),
        )
        .route("/ud/{name}", put(handle_upload_put_named))
        .route("/ud/f/{token}/{filename}", get(handle_download));

    let router = if state.config.base_path.is_empty() {
        routes
    } else {
        Router::new().nest(&state.config.base_path, routes)
    };

    router
        .fallback(handle_unknown_route)
        // Method mismatches are as opaque as unknown paths.
        .method_not_allowed_fallback(handle_unknown_route)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Bind and serve the relay until the process exits.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), ServiceError> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            addr: addr.to_string(),
            message: e.to_string(),
        })?;
    info!(%addr, "relay listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })
}

async fn handle_unknown_route() -> Response {
    empty_not_found()
}

// ============================================================================
// Health and Help
// ============================================================================

async fn handle_health(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let snapshot = match state.actor.health().await {
        Ok(snapshot) => snapshot,
        Err(err) => return ApiError::from(err).into_response(),
    };

    // Store usage is advisory; a listing failure degrades to zeros
    // rather than taking the health endpoint down with it.
    let (store_objects, store_bytes) = match state.blobs.list(OBJECT_PREFIX).await {
        Ok(entries) => (
            entries.len() as u64,
            entries.iter().map(|e| e.size).sum::<u64>(),
        ),
        Err(err) => {
            warn!(error = %err, "blob store listing failed");
            (0, 0)
        }
    };

    match detect_client(&headers, params.get("format").map(String::as_str)) {
        ClientKind::Browser => Html(health_html(
            snapshot.hc_count,
            snapshot.pending_tokens,
            snapshot.pending_bytes,
            store_objects,
            store_bytes,
        ))
        .into_response(),
        ClientKind::Cli => Json(HealthResponse {
            hc_count: snapshot.hc_count,
            pending_tokens: snapshot.pending_tokens,
            pending_bytes: snapshot.pending_bytes,
            store_objects,
            store_bytes,
        })
        .into_response(),
    }
}

async fn handle_help(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    match detect_client(&headers, params.get("format").map(String::as_str)) {
        ClientKind::Browser => Html(help_html(&state.config.base_path)).into_response(),
        ClientKind::Cli => help_text(&state.config.base_path).into_response(),
    }
}

async fn handle_upload_page(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    match detect_client(&headers, params.get("format").map(String::as_str)) {
        ClientKind::Browser => Html(upload_form(&state.config.base_path, None)).into_response(),
        ClientKind::Cli => help_text(&state.config.base_path).into_response(),
    }
}

// ============================================================================
// Uploads
// ============================================================================

async fn handle_upload_post(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let client = detect_client(&headers, params.get("format").map(String::as_str));

    let is_multipart = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("multipart/form-data"))
        .unwrap_or(false);

    let result = if is_multipart {
        match Multipart::from_request(request, &()).await {
            Ok(multipart) => multipart_upload(&state, &params, &headers, multipart).await,
            Err(rejection) => Err(ApiError::BadRequest {
                message: rejection.to_string(),
            }),
        }
    } else {
        raw_text_upload(&state, &params, &headers, request).await
    };

    respond_upload(&state, client, result)
}

async fn handle_upload_put(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let client = detect_client(&headers, params.get("format").map(String::as_str));
    let result = put_upload(&state, &params, &headers, None, request).await;
    respond_upload(&state, client, result)
}

async fn handle_upload_put_named(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    request: Request,
) -> Response {
    let client = detect_client(&headers, params.get("format").map(String::as_str));
    let result = put_upload(&state, &params, &headers, Some(name), request).await;
    respond_upload(&state, client, result)
}

/// Multipart form upload: field `file`, optional field `key`.
async fn multipart_upload(
    state: &AppState,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    multipart: Multipart,
) -> Result<String, ApiError> {
    let upload = collect_multipart(multipart).await?;

    let max_bytes = state.actor.limits().max_bytes();
    let size = upload.data.len() as u64;
    if size > max_bytes {
        return Err(ApiError::PayloadTooLarge { size, max_bytes });
    }

    let key = upload.key.or_else(|| submitted_key(params, headers));
    let filename = upload.filename.unwrap_or_else(random_fallback_name);
    process_upload(state, headers, key, filename, upload.content_type, upload.data).await
}

/// Raw text upload: whatever non-multipart body lands on `POST /ud` is
/// stored as `<timestamp>.txt`.
async fn raw_text_upload(
    state: &AppState,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    request: Request,
) -> Result<String, ApiError> {
    let max_bytes = state.actor.limits().max_bytes();
    let data = to_bytes(request.into_body(), max_bytes as usize + 1)
        .await
        .map_err(|e| ApiError::BadRequest {
            message: format!("failed to read body: {e}"),
        })?;

    let size = data.len() as u64;
    if size > max_bytes {
        return Err(ApiError::PayloadTooLarge { size, max_bytes });
    }

    let filename = timestamp_text_name(now_secs());
    let key = submitted_key(params, headers);
    process_upload(
        state,
        headers,
        key,
        filename,
        "text/plain; charset=utf-8".to_string(),
        data,
    )
    .await
}

/// Streamed PUT upload.
///
/// The declared `Content-Length` is required and gated against the
/// size ceiling before the state actor is contacted.
async fn put_upload(
    state: &AppState,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    path_name: Option<String>,
    request: Request,
) -> Result<String, ApiError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .ok_or(ApiError::LengthRequired)?;

    let max_bytes = state.actor.limits().max_bytes();
    if declared > max_bytes {
        return Err(ApiError::PayloadTooLarge {
            size: declared,
            max_bytes,
        });
    }

    let filename = resolve_put_filename(params, headers, path_name.as_deref());
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let key = submitted_key(params, headers);

    let data = to_bytes(request.into_body(), max_bytes as usize + 1)
        .await
        .map_err(|e| ApiError::BadRequest {
            message: format!("failed to read body: {e}"),
        })?;

    process_upload(state, headers, key, filename, content_type, data).await
}

/// Reserve → put → async commit.
///
/// A failed blob write aborts the reservation best-effort and surfaces
/// as a storage failure; a successful write schedules the commit
/// without blocking the response on it.
async fn process_upload(
    state: &AppState,
    headers: &HeaderMap,
    key: Option<String>,
    filename: String,
    content_type: String,
    data: Bytes,
) -> Result<String, ApiError> {
    let ip = client_ip(headers);
    let reservation = state
        .actor
        .reserve(ReserveRequest {
            ip,
            key,
            filename,
            size: data.len() as u64,
            content_type,
        })
        .await?;

    let meta = BlobMeta::new(reservation.filename.clone(), now_secs());
    if let Err(err) = state.blobs.put(&reservation.object_key, data, meta).await {
        warn!(error = %err, token = %reservation.token, "blob put failed, aborting reservation");
        let actor = state.actor.clone();
        let token = reservation.token.clone();
        tokio::spawn(async move {
            if let Err(abort_err) = actor.abort(&token).await {
                warn!(error = %abort_err, "abort after failed put also failed");
            }
        });
        return Err(ApiError::Storage {
            message: err.to_string(),
        });
    }

    let actor = state.actor.clone();
    let token = reservation.token.clone();
    tokio::spawn(async move {
        if let Err(err) = actor.commit(&token).await {
            warn!(error = %err, token = %token, "async commit failed");
        }
    });

    let origin = request_origin(headers, state.config.public_origin.as_deref());
    Ok(download_url(
        &origin,
        &state.config.base_path,
        &reservation.token,
        &reservation.filename,
    ))
}

/// Render an upload outcome for the detected client kind.
///
/// Browser clients get the form back with the error line; CLI clients
/// get a plain status line. Misses stay opaque for everyone.
fn respond_upload(state: &AppState, client: ClientKind, result: Result<String, ApiError>) -> Response {
    match (client, result) {
        (ClientKind::Cli, Ok(url)) => {
            (StatusCode::CREATED, upload_success_text(&url)).into_response()
        }
        (ClientKind::Browser, Ok(url)) => {
            (StatusCode::CREATED, Html(upload_success_html(&url))).into_response()
        }
        (ClientKind::Browser, Err(err)) if !matches!(err, ApiError::NotFound) => (
            err.status(),
            Html(upload_form(&state.config.base_path, Some(&err.message()))),
        )
            .into_response(),
        (_, Err(err)) => err.into_response(),
    }
}

// ============================================================================
// Download
// ============================================================================

async fn handle_download(
    State(state): State<AppState>,
    Path((token, filename)): Path<(String, String)>,
) -> Response {
    let name = match sanitize_filename(&filename) {
        Some(name) => name,
        None => return empty_not_found(),
    };

    // Claim before streaming: the flip to `claimed` is durable before
    // any byte leaves, so a crash mid-stream can never leave the token
    // reusable.
    let claimed = match state.actor.claim(&token, &name).await {
        Ok(claimed) => claimed,
        Err(err) => {
            if let StateError::Store(store_err) = &err {
                error!(error = %store_err, "claim failed on storage");
            }
            return empty_not_found();
        }
    };

    let blob = match state.blobs.get(&claimed.object_key).await {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            // The token was spent either way; drop its metadata.
            schedule_finalize(&state, claimed.object_key.clone(), token.clone());
            return empty_not_found();
        }
        Err(err) => {
            error!(error = %err, key = %claimed.object_key, "blob fetch failed after claim");
            schedule_finalize(&state, claimed.object_key.clone(), token.clone());
            return empty_not_found();
        }
    };

    schedule_finalize(&state, claimed.object_key.clone(), token.clone());

    let content_type = if claimed.content_type.is_empty() {
        HeaderValue::from_static("application/octet-stream")
    } else {
        HeaderValue::from_str(&claimed.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
    };
    let disposition = HeaderValue::from_str(&content_disposition(&claimed.filename))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
            ),
            (header::PRAGMA, HeaderValue::from_static("no-cache")),
            (header::EXPIRES, HeaderValue::from_static("0")),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
        ],
        blob.data,
    )
        .into_response()
}

/// Detached post-download cleanup: delete the blob, then drop the token.
///
/// Runs on its own task so a client disconnect mid-response cannot keep
/// the token alive.
fn schedule_finalize(state: &AppState, object_key: String, token: String) {
    let actor = state.actor.clone();
    let blobs = state.blobs.clone();
    tokio::spawn(async move {
        if let Err(err) = blobs.delete(&object_key).await {
            warn!(error = %err, key = %object_key, "post-download blob delete failed");
        }
        if let Err(err) = actor.finalize(&token).await {
            warn!(error = %err, "finalize failed");
        }
    });
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
