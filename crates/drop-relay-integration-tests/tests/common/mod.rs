//! Common test utilities for drop-relay integration tests
//!
//! Builds the full relay (router, state actor, blob janitor) over
//! in-memory stores so scenarios run entirely through the HTTP surface.

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use drop_relay_api::{create_router, ApiConfig, AppState};
use drop_relay_core::adapters::memory::{MemoryBlobStore, MemoryStateStore};
use drop_relay_core::{RelayLimits, StateActor};
use http_body_util::BodyExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// A relay wired over memory stores, plus handles for assertions.
pub struct TestRelay {
    pub app: Router,
    pub blobs: Arc<MemoryBlobStore>,
}

#[allow(dead_code)]
pub fn open_limits() -> RelayLimits {
    RelayLimits {
        rate_limit_sec: 0,
        ..RelayLimits::default()
    }
}

pub async fn relay_with_limits(limits: RelayLimits) -> TestRelay {
    let blobs = Arc::new(MemoryBlobStore::new());
    let store = Arc::new(MemoryStateStore::new());
    let (deletions_tx, deletions_rx) = mpsc::unbounded_channel();
    let actor = Arc::new(StateActor::load(store, limits, deletions_tx).await.unwrap());
    drop_relay_service::spawn_blob_janitor(deletions_rx, blobs.clone());

    let state = AppState {
        actor,
        blobs: blobs.clone(),
        config: ApiConfig::default(),
    };
    TestRelay {
        app: create_router(state),
        blobs,
    }
}

/// Let spawned commit/finalize/janitor work run to completion.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Pull the download URL path out of a CLI upload response body.
pub fn url_path(body: &str) -> String {
    let url = body.lines().nth(1).expect("URL on second line");
    let idx = url.find("/ud/f/").expect("download path in URL");
    url[idx..].to_string()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Streamed PUT with an optional client address.
pub fn put(uri: &str, body: &str, ip: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("PUT")
        .uri(uri)
        .header(header::CONTENT_LENGTH, body.len().to_string());
    if let Some(ip) = ip {
        builder = builder.header("x-forwarded-for", ip);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Multipart POST with a single `file` field.
#[allow(dead_code)]
pub fn multipart_post(uri: &str, filename: &str, contents: &str) -> Request<Body> {
    let boundary = "itestboundary42";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n\
         {contents}\r\n\
         --{boundary}--\r\n"
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Upload via PUT and return the download URL path.
pub async fn upload(relay: &TestRelay, name: &str, contents: &str) -> String {
    let response = relay
        .app
        .clone()
        .oneshot(put(&format!("/ud?name={name}"), contents, None))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    let body = body_string(response).await;
    settle().await;
    url_path(&body)
}
