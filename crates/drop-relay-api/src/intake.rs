//! # Upload Intake
//!
//! Normalizes the three upload shapes — multipart form, streamed PUT,
//! raw text POST — into filename, content type, and bytes before the
//! handler talks to the state actor.

use crate::errors::ApiError;
use axum::extract::Multipart;
use axum::http::{header, HeaderMap};
use bytes::Bytes;
use percent_encoding::percent_decode_str;
use rand::RngExt;
use std::collections::HashMap;

/// Query parameters consulted for a streamed PUT filename, in order.
const NAME_PARAMS: [&str; 2] = ["name", "filename"];

/// Headers consulted for a streamed PUT filename, in order.
const NAME_HEADERS: [&str; 2] = ["x-filename", "x-file-name"];

/// A collected multipart upload.
#[derive(Debug)]
pub struct MultipartUpload {
    pub filename: Option<String>,
    pub content_type: String,
    pub data: Bytes,
    /// Value of the optional `key` form field.
    pub key: Option<String>,
}

/// Collect the `file` part (and optional `key` field) from a multipart
/// form body.
pub async fn collect_multipart(mut multipart: Multipart) -> Result<MultipartUpload, ApiError> {
    let mut upload: Option<(Option<String>, String, Bytes)> = None;
    let mut key = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest {
        message: format!("unreadable multipart body: {e}"),
    })? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().map(|name| name.to_string());
                let content_type = field
                    .content_type()
                    .map(|ct| ct.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(|e| ApiError::BadRequest {
                    message: format!("unreadable file field: {e}"),
                })?;
                upload = Some((filename, content_type, data));
            }
            Some("key") => {
                key = field
                    .text()
                    .await
                    .ok()
                    .map(|value| value.trim().to_string())
                    .filter(|value| !value.is_empty());
            }
            _ => {
                // Unknown fields are drained and ignored.
                let _ = field.bytes().await;
            }
        }
    }

    let (filename, content_type, data) = upload.ok_or_else(|| ApiError::BadRequest {
        message: "missing file field".to_string(),
    })?;
    Ok(MultipartUpload {
        filename,
        content_type,
        data,
        key,
    })
}

/// Resolve the filename for a streamed PUT.
///
/// Priority: query `name`/`filename` → `X-Filename`/`X-File-Name`
/// header → `Content-Disposition` (RFC 5987 and plain forms) → trailing
/// path segment → random fallback.
pub fn resolve_put_filename(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    path_segment: Option<&str>,
) -> String {
    for param in NAME_PARAMS {
        if let Some(value) = query.get(param) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    for name in NAME_HEADERS {
        if let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) {
            let value = value.trim();
            if !value.is_empty() {
                return value.to_string();
            }
        }
    }

    if let Some(value) = headers
        .get(header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(name) = filename_from_content_disposition(value) {
            return name;
        }
    }

    if let Some(segment) = path_segment {
        let segment = segment.trim();
        if !segment.is_empty() {
            return segment.to_string();
        }
    }

    random_fallback_name()
}

/// Pull a filename out of a `Content-Disposition` header value.
///
/// The RFC 5987 `filename*=UTF-8''…` form wins over the plain quoted
/// form when both are present.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    for part in value.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename*=") {
            let mut pieces = rest.splitn(3, '\'');
            let charset = pieces.next()?;
            let _language = pieces.next()?;
            let encoded = pieces.next()?;
            if charset.eq_ignore_ascii_case("utf-8") {
                if let Ok(decoded) = percent_decode_str(encoded).decode_utf8() {
                    let decoded = decoded.trim();
                    if !decoded.is_empty() {
                        return Some(decoded.to_string());
                    }
                }
            }
        }
    }

    for part in value.split(';') {
        let part = part.trim();
        if let Some(rest) = part.strip_prefix("filename=") {
            let name = rest.trim().trim_matches('"').trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }

    None
}

/// Fallback name for uploads that arrive without any usable filename:
/// eight random lowercase letters plus `.bin`.
pub fn random_fallback_name() -> String {
    let mut rng = rand::rng();
    let letters: String = (0..8).map(|_| rng.random_range(b'a'..=b'z') as char).collect();
    format!("{letters}.bin")
}

/// Name given to raw text uploads.
pub fn timestamp_text_name(now: i64) -> String {
    format!("{now}.txt")
}

/// Best-effort client address for rate limiting.
///
/// The relay sits behind an edge proxy, so forwarded headers are the
/// source of truth; without them every client shares one bucket.
pub fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real = real.trim();
        if !real.is_empty() {
            return real.to_string();
        }
    }
    "unknown".to_string()
}

/// API key from query string or `X-API-Key` header (form-field keys are
/// handled by the multipart path).
pub fn submitted_key(query: &HashMap<String, String>, headers: &HeaderMap) -> Option<String> {
    if let Some(key) = query.get("key") {
        let key = key.trim();
        if !key.is_empty() {
            return Some(key.to_string());
        }
    }
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "intake_tests.rs"]
mod tests;
