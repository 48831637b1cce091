//! Tests for filename sanitization

use super::*;

// ============================================================================
// sanitize_filename
// ============================================================================

#[test]
fn test_plain_name_passes_through() {
    assert_eq!(sanitize_filename("hello.txt"), Some("hello.txt".to_string()));
}

#[test]
fn test_surrounding_whitespace_is_trimmed() {
    assert_eq!(sanitize_filename("  report.pdf  "), Some("report.pdf".to_string()));
}

#[test]
fn test_path_segments_are_stripped() {
    assert_eq!(sanitize_filename("/etc/passwd"), Some("passwd".to_string()));
    assert_eq!(sanitize_filename("dir/sub/file.bin"), Some("file.bin".to_string()));
    assert_eq!(
        sanitize_filename("C:\\Users\\me\\doc.txt"),
        Some("doc.txt".to_string())
    );
}

#[test]
fn test_control_characters_are_dropped() {
    assert_eq!(sanitize_filename("a\rb\nc\td\0.txt"), Some("abcd.txt".to_string()));
}

#[test]
fn test_reserved_characters_become_underscores() {
    assert_eq!(
        sanitize_filename("a<b>c:d\"e|f?g*h.txt"),
        Some("a_b_c_d_e_f_g_h.txt".to_string())
    );
}

#[test]
fn test_whitespace_runs_collapse() {
    assert_eq!(sanitize_filename("my    big   file.txt"), Some("my big file.txt".to_string()));
}

#[test]
fn test_trailing_dots_and_spaces_are_trimmed() {
    assert_eq!(sanitize_filename("name... "), Some("name".to_string()));
    assert_eq!(sanitize_filename("name. . ."), Some("name".to_string()));
}

#[test]
fn test_degenerate_names_are_rejected() {
    assert_eq!(sanitize_filename(""), None);
    assert_eq!(sanitize_filename("   "), None);
    assert_eq!(sanitize_filename("."), None);
    assert_eq!(sanitize_filename(".."), None);
    assert_eq!(sanitize_filename("dir/"), None);
    assert_eq!(sanitize_filename("...."), None);
}

#[test]
fn test_long_names_truncate_on_char_boundary() {
    let long = "é".repeat(150); // 300 bytes
    let sanitized = sanitize_filename(&long).unwrap();
    assert!(sanitized.len() <= MAX_FILENAME_BYTES);
    assert_eq!(sanitized, "é".repeat(100)); // 200 bytes, clean boundary
}

#[test]
fn test_truncation_backs_off_mid_character() {
    // 199 ASCII bytes followed by a two-byte character: the cut at 200
    // would split it, so the result backs off to 199 bytes.
    let name = format!("{}é", "a".repeat(199));
    let sanitized = sanitize_filename(&name).unwrap();
    assert_eq!(sanitized.len(), 199);
    assert!(sanitized.is_char_boundary(sanitized.len()));
}

#[test]
fn test_sanitize_is_idempotent() {
    let inputs = [
        "hello.txt",
        "  spaced   name.bin  ",
        "dir\\sub\\we<ird>.dat",
        "trailing...",
        "Ünïcödé名前.tar.gz",
        "a\rb\nc.txt",
        &"x".repeat(400),
    ];
    for input in inputs {
        if let Some(once) = sanitize_filename(input) {
            let twice = sanitize_filename(&once).expect("sanitized output must stay valid");
            assert_eq!(once, twice, "sanitize not idempotent for {input:?}");
        }
    }
}

#[test]
fn test_unicode_names_survive() {
    assert_eq!(sanitize_filename("名前.txt"), Some("名前.txt".to_string()));
}

// ============================================================================
// extension
// ============================================================================

#[test]
fn test_extension_extraction() {
    assert_eq!(extension("hello.txt"), ".txt");
    assert_eq!(extension("archive.tar.gz"), ".gz");
    assert_eq!(extension("noext"), "");
    assert_eq!(extension(".hidden"), "");
    assert_eq!(extension("trailingdot."), "");
    assert_eq!(extension("weird.t@r"), "");
}

#[test]
fn test_extension_length_cap() {
    assert_eq!(extension("file.abcdefghijklmnop"), ""); // 17 bytes with dot
    assert_eq!(extension("file.abcdefghijklmno"), ".abcdefghijklmno"); // 16 bytes
}

// ============================================================================
// ascii_fallback
// ============================================================================

#[test]
fn test_fallback_replaces_non_ascii() {
    assert_eq!(ascii_fallback("naïve.txt"), "na_ve.txt");
    assert_eq!(ascii_fallback("名前.txt"), "__.txt");
}

#[test]
fn test_fallback_escapes_quote_and_backslash() {
    assert_eq!(ascii_fallback("a\"b\\c.txt"), "a_b_c.txt");
}

#[test]
fn test_fallback_defaults_to_download() {
    assert_eq!(ascii_fallback(""), "download");
}

#[test]
fn test_fallback_is_capped() {
    let long = "a".repeat(500);
    assert_eq!(ascii_fallback(&long).len(), MAX_FALLBACK_BYTES);
}

// ============================================================================
// rfc5987_encode
// ============================================================================

#[test]
fn test_rfc5987_passes_attr_chars() {
    assert_eq!(rfc5987_encode("hello.txt"), "hello.txt");
    assert_eq!(rfc5987_encode("a-b_c.d~e"), "a-b_c.d~e");
}

#[test]
fn test_rfc5987_encodes_spaces_and_unicode() {
    assert_eq!(rfc5987_encode("a b"), "a%20b");
    assert_eq!(rfc5987_encode("名"), "%E5%90%8D");
}

// ============================================================================
// truncate_utf8
// ============================================================================

#[test]
fn test_truncate_utf8_short_input_unchanged() {
    assert_eq!(truncate_utf8("abc", 10), "abc");
}

#[test]
fn test_truncate_utf8_respects_boundaries() {
    assert_eq!(truncate_utf8("aé", 2), "a");
    assert_eq!(truncate_utf8("aé", 3), "aé");
}
