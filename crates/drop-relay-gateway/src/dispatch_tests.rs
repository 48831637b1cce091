//! Tests for the upstream dispatcher

use super::*;
use crate::message::Message;
use bytes::Bytes;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn text_message(content: &str) -> Message {
    Message::Text {
        content: content.to_string(),
        mentioned_list: vec![],
        mentioned_mobile_list: vec![],
    }
}

fn config_for(server: &MockServer) -> GatewayConfig {
    GatewayConfig::new("test-key", vec![]).with_upstream(
        format!("{}/send", server.uri()),
        format!("{}/upload", server.uri()),
    )
}

// ============================================================================
// Multipart body construction
// ============================================================================

#[test]
fn test_media_form_boundary_shape() {
    let (boundary, _body) = build_media_form("a.txt", "text/plain", b"data");
    let suffix = boundary.strip_prefix("----DropRelayForm").unwrap();
    assert_eq!(suffix.len(), 16);
    assert!(suffix.bytes().all(|b| b.is_ascii_hexdigit()));
}

#[test]
fn test_media_form_layout() {
    let (boundary, body) = build_media_form("report.pdf", "application/pdf", b"PDFDATA");
    let text = String::from_utf8(body).unwrap();
    assert_eq!(
        text,
        format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"media\"; filename=\"report.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n\
             PDFDATA\r\n\
             --{boundary}--\r\n"
        )
    );
}

#[test]
fn test_media_form_boundaries_are_unique() {
    let (a, _) = build_media_form("a", "b", b"c");
    let (b, _) = build_media_form("a", "b", b"c");
    assert_ne!(a, b);
}

// ============================================================================
// Single-step send
// ============================================================================

#[tokio::test]
async fn test_send_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0,
            "errmsg": "ok",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(config_for(&server));
    let report = dispatcher.dispatch(text_message("hello")).await.unwrap();

    assert!(report.ok);
    assert_eq!(report.upstream_status, Some(200));
    assert_eq!(report.errcode, Some(0));
    assert_eq!(report.errmsg.as_deref(), Some("ok"));
    assert_eq!(report.media_id, None);

    // The wire body is the fixed envelope shape.
    let requests = server.received_requests().await.unwrap();
    let sent: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(
        sent,
        json!({
            "msgtype": "text",
            "text": {
                "content": "hello",
                "mentioned_list": [],
                "mentioned_mobile_list": [],
            }
        })
    );
}

#[tokio::test]
async fn test_nonzero_errcode_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 93000,
            "errmsg": "invalid webhook url",
        })))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(config_for(&server));
    let report = dispatcher.dispatch(text_message("x")).await.unwrap();

    assert!(!report.ok, "errcode != 0 must not count as success");
    assert_eq!(report.upstream_status, Some(200));
    assert_eq!(report.errcode, Some(93000));
}

#[tokio::test]
async fn test_http_error_status_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(config_for(&server));
    let report = dispatcher.dispatch(text_message("x")).await.unwrap();
    assert!(!report.ok);
    assert_eq!(report.upstream_status, Some(500));
}

#[tokio::test]
async fn test_transport_failure_reports_no_status() {
    // Nothing listens on port 1.
    let config = GatewayConfig::new("k", vec![])
        .with_upstream("http://127.0.0.1:1/send", "http://127.0.0.1:1/upload");
    let dispatcher = Dispatcher::new(config);

    let report = dispatcher.dispatch(text_message("x")).await.unwrap();
    assert!(!report.ok);
    assert_eq!(report.upstream_status, None);
    assert!(report.errmsg.is_some());
}

// ============================================================================
// Two-step file dispatch
// ============================================================================

#[tokio::test]
async fn test_file_upload_then_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0,
            "errmsg": "ok",
            "media_id": "MEDIA42",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 0,
            "errmsg": "ok",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(config_for(&server));
    let report = dispatcher
        .dispatch(Message::FileUpload {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            data: Bytes::from_static(b"file body"),
        })
        .await
        .unwrap();

    assert!(report.ok);
    assert_eq!(report.media_id.as_deref(), Some("MEDIA42"));
    assert_eq!(report.upload_status, Some(200));
    assert_eq!(report.upload_errcode, Some(0));
    assert_eq!(report.send_status, Some(200));
    assert_eq!(report.send_errcode, Some(0));
    assert_eq!(report.upstream_status, Some(200));

    let requests = server.received_requests().await.unwrap();
    let upload_request = requests
        .iter()
        .find(|r| r.url.path() == "/upload")
        .expect("upload request");

    // Single `media` part, accurate Content-Length, boundary in header.
    let content_type = upload_request
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary=----DropRelayForm"));
    let body = String::from_utf8(upload_request.body.clone()).unwrap();
    assert!(body.contains("name=\"media\""));
    assert!(body.contains("filename=\"notes.txt\""));
    assert!(body.contains("file body"));
    let declared_length: usize = upload_request
        .headers
        .get("content-length")
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert_eq!(declared_length, upload_request.body.len());

    let send_request = requests
        .iter()
        .find(|r| r.url.path() == "/send")
        .expect("send request");
    let envelope: serde_json::Value = serde_json::from_slice(&send_request.body).unwrap();
    assert_eq!(
        envelope,
        json!({"msgtype": "file", "file": {"media_id": "MEDIA42"}})
    );
}

#[tokio::test]
async fn test_failed_upload_skips_send() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errcode": 40009,
            "errmsg": "media size out of range",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = Dispatcher::new(config_for(&server));
    let report = dispatcher
        .dispatch(Message::FileUpload {
            filename: "a.bin".to_string(),
            content_type: "application/octet-stream".to_string(),
            data: Bytes::from_static(b"123456"),
        })
        .await
        .unwrap();

    assert!(!report.ok);
    assert_eq!(report.media_id, None);
    assert_eq!(report.upload_status, Some(200));
    assert_eq!(report.upload_errcode, Some(40009));
    assert_eq!(report.send_status, None);
    // The failing leg's detail is surfaced at the top level.
    assert_eq!(report.errcode, Some(40009));
    assert_eq!(report.errmsg.as_deref(), Some("media size out of range"));
}
