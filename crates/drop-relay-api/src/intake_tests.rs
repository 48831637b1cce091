//! Tests for upload intake normalization

use super::*;
use axum::http::HeaderValue;

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.insert(
            axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
    }
    map
}

// ============================================================================
// PUT filename resolution priority
// ============================================================================

#[test]
fn test_query_name_wins() {
    let name = resolve_put_filename(
        &query(&[("name", "from-query.txt")]),
        &headers(&[("x-filename", "from-header.txt")]),
        Some("from-path.txt"),
    );
    assert_eq!(name, "from-query.txt");
}

#[test]
fn test_query_filename_param_also_works() {
    let name = resolve_put_filename(&query(&[("filename", "alt.txt")]), &HeaderMap::new(), None);
    assert_eq!(name, "alt.txt");
}

#[test]
fn test_header_beats_content_disposition_and_path() {
    let name = resolve_put_filename(
        &HashMap::new(),
        &headers(&[
            ("x-file-name", "from-header.txt"),
            ("content-disposition", "attachment; filename=\"cd.txt\""),
        ]),
        Some("from-path.txt"),
    );
    assert_eq!(name, "from-header.txt");
}

#[test]
fn test_content_disposition_beats_path() {
    let name = resolve_put_filename(
        &HashMap::new(),
        &headers(&[("content-disposition", "attachment; filename=\"cd.txt\"")]),
        Some("from-path.txt"),
    );
    assert_eq!(name, "cd.txt");
}

#[test]
fn test_path_segment_is_used_when_nothing_else_matches() {
    let name = resolve_put_filename(&HashMap::new(), &HeaderMap::new(), Some("trailing.bin"));
    assert_eq!(name, "trailing.bin");
}

#[test]
fn test_random_fallback_shape() {
    let name = resolve_put_filename(&HashMap::new(), &HeaderMap::new(), None);
    assert_eq!(name.len(), 12);
    assert!(name.ends_with(".bin"));
    assert!(name[..8].bytes().all(|b| b.is_ascii_lowercase()));
}

#[test]
fn test_empty_candidates_are_skipped() {
    let name = resolve_put_filename(
        &query(&[("name", "  ")]),
        &headers(&[("x-filename", "")]),
        Some("real.txt"),
    );
    assert_eq!(name, "real.txt");
}

// ============================================================================
// Content-Disposition parsing
// ============================================================================

#[test]
fn test_plain_filename_quoted_and_bare() {
    assert_eq!(
        filename_from_content_disposition("attachment; filename=\"a b.txt\""),
        Some("a b.txt".to_string())
    );
    assert_eq!(
        filename_from_content_disposition("attachment; filename=plain.txt"),
        Some("plain.txt".to_string())
    );
}

#[test]
fn test_rfc5987_form_wins() {
    let value = "attachment; filename=\"fallback.txt\"; filename*=UTF-8''na%C3%AFve.txt";
    assert_eq!(
        filename_from_content_disposition(value),
        Some("naïve.txt".to_string())
    );
}

#[test]
fn test_rfc5987_with_language_tag() {
    assert_eq!(
        filename_from_content_disposition("attachment; filename*=utf-8'en'hello%20world.txt"),
        Some("hello world.txt".to_string())
    );
}

#[test]
fn test_rfc5987_unknown_charset_falls_back() {
    let value = "attachment; filename*=ISO-8859-1''f%FCr.txt; filename=\"fur.txt\"";
    assert_eq!(
        filename_from_content_disposition(value),
        Some("fur.txt".to_string())
    );
}

#[test]
fn test_no_filename_yields_none() {
    assert_eq!(filename_from_content_disposition("inline"), None);
}

// ============================================================================
// Helpers
// ============================================================================

#[test]
fn test_timestamp_text_name() {
    assert_eq!(timestamp_text_name(1_700_000_000), "1700000000.txt");
}

#[test]
fn test_client_ip_prefers_forwarded_for() {
    let map = headers(&[
        ("x-forwarded-for", "203.0.113.9, 10.0.0.1"),
        ("x-real-ip", "198.51.100.7"),
    ]);
    assert_eq!(client_ip(&map), "203.0.113.9");
}

#[test]
fn test_client_ip_falls_back_to_real_ip_then_unknown() {
    let map = headers(&[("x-real-ip", "198.51.100.7")]);
    assert_eq!(client_ip(&map), "198.51.100.7");
    assert_eq!(client_ip(&HeaderMap::new()), "unknown");
}

#[test]
fn test_submitted_key_sources() {
    assert_eq!(
        submitted_key(&query(&[("key", "abc")]), &HeaderMap::new()),
        Some("abc".to_string())
    );
    assert_eq!(
        submitted_key(&HashMap::new(), &headers(&[("x-api-key", "hdr")])),
        Some("hdr".to_string())
    );
    assert_eq!(submitted_key(&HashMap::new(), &HeaderMap::new()), None);
}
