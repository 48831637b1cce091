//! # Response Rendering
//!
//! Browser/CLI detection, download URL construction, response headers,
//! and the small static HTML pages.
//!
//! The relay speaks two dialects: terse text for CLI tools and minimal
//! HTML for browsers. The choice is a heuristic on `Accept` and
//! `User-Agent` with a `?format=` override — nothing behavioral hangs
//! off it, only presentation.

use drop_relay_core::sanitize::{ascii_fallback, rfc5987_encode};
use axum::http::{header, HeaderMap};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped when a filename is embedded as a URL path segment.
const PATH_SEGMENT_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%');

/// How the client wants its responses rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    Browser,
    Cli,
}

/// Decide between HTML and text rendering.
///
/// `?format=html` / `?format=text` override; otherwise a client counts
/// as a browser when it both accepts `text/html` and sends a
/// Mozilla-style `User-Agent`.
pub fn detect_client(headers: &HeaderMap, format_override: Option<&str>) -> ClientKind {
    match format_override {
        Some("html") => return ClientKind::Browser,
        Some("text") | Some("plain") | Some("json") => return ClientKind::Cli,
        _ => {}
    }

    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);
    let mozilla = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Mozilla"))
        .unwrap_or(false);

    if accepts_html && mozilla {
        ClientKind::Browser
    } else {
        ClientKind::Cli
    }
}

/// Origin for generated download URLs.
///
/// An explicitly configured public origin wins; otherwise the origin is
/// reconstructed from forwarded-proto and `Host`.
pub fn request_origin(headers: &HeaderMap, public_origin: Option<&str>) -> String {
    if let Some(origin) = public_origin {
        return origin.trim_end_matches('/').to_string();
    }
    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{proto}://{host}")
}

/// Percent-encode one URL path segment.
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT_ESCAPE).to_string()
}

/// Build the one-shot download URL for a reservation.
pub fn download_url(origin: &str, base_path: &str, token: &str, filename: &str) -> String {
    format!(
        "{origin}{base_path}/ud/f/{}/{}",
        encode_path_segment(token),
        encode_path_segment(filename)
    )
}

/// `Content-Disposition` for downloads: quoted ASCII fallback plus the
/// RFC 5987 original.
pub fn content_disposition(filename: &str) -> String {
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(filename),
        rfc5987_encode(filename)
    )
}

// ============================================================================
// Pages
// ============================================================================

/// Plain-text help shown to CLI clients.
pub fn help_text(base_path: &str) -> String {
    format!(
        "drop-relay: one-shot file relay\n\
         \n\
         upload:   PUT  {base_path}/ud?name=<filename>   (body = file, Content-Length required)\n\
                   POST {base_path}/ud                   (multipart form, field 'file')\n\
                   POST {base_path}/ud                   (raw text body)\n\
         download: GET  the returned URL — works exactly once, then the file is gone\n\
         health:   GET  {base_path}/hc\n"
    )
}

/// HTML help for browsers.
pub fn help_html(base_path: &str) -> String {
    page(
        "drop-relay help",
        &format!(
            "<h1>drop-relay</h1>\
             <p>Upload a file, get a link, share it. The first download destroys the file.</p>\
             <ul>\
             <li><code>PUT {base_path}/ud?name=&lt;filename&gt;</code> — streamed upload</li>\
             <li><code>POST {base_path}/ud</code> — multipart form (field <code>file</code>)</li>\
             <li><code>GET {base_path}/hc</code> — health counters</li>\
             </ul>\
             <p><a href=\"{base_path}/ud\">Upload form</a></p>"
        ),
    )
}

/// The browser upload form, with an optional error line above it.
pub fn upload_form(base_path: &str, error: Option<&str>) -> String {
    let error_line = match error {
        Some(message) => format!("<p class=\"err\">{}</p>", escape_html(message.trim())),
        None => String::new(),
    };
    page(
        "drop-relay upload",
        &format!(
            "<h1>Upload</h1>{error_line}\
             <form method=\"post\" action=\"{base_path}/ud\" enctype=\"multipart/form-data\">\
             <p><input type=\"file\" name=\"file\" required></p>\
             <p><input type=\"password\" name=\"key\" placeholder=\"API key (if required)\"></p>\
             <p><button type=\"submit\">Upload</button></p>\
             </form>\
             <p>The link you get back works exactly once.</p>"
        ),
    )
}

/// Success page for browser uploads.
pub fn upload_success_html(url: &str) -> String {
    let escaped = escape_html(url);
    page(
        "uploaded",
        &format!(
            "<h1>Uploaded</h1>\
             <p>One-shot link (the first download destroys the file):</p>\
             <p><a href=\"{escaped}\">{escaped}</a></p>"
        ),
    )
}

/// Success body for CLI uploads: `OK` then the URL, newline-terminated.
pub fn upload_success_text(url: &str) -> String {
    format!("OK\n{url}\n")
}

/// HTML health panel for browsers.
pub fn health_html(
    hc_count: u64,
    pending_tokens: u64,
    pending_bytes: u64,
    store_objects: u64,
    store_bytes: u64,
) -> String {
    page(
        "drop-relay health",
        &format!(
            "<h1>Health</h1>\
             <table>\
             <tr><td>checks</td><td>{hc_count}</td></tr>\
             <tr><td>pending tokens</td><td>{pending_tokens}</td></tr>\
             <tr><td>pending bytes</td><td>{pending_bytes}</td></tr>\
             <tr><td>stored objects</td><td>{store_objects}</td></tr>\
             <tr><td>stored bytes</td><td>{store_bytes}</td></tr>\
             </table>"
        ),
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>{title}</title>\
         <style>body{{font-family:sans-serif;max-width:40rem;margin:2rem auto;padding:0 1rem}}\
         .err{{color:#b00}}</style>\
         </head><body>{body}</body></html>"
    )
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
