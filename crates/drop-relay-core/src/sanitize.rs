//! # Filename Sanitization
//!
//! Shared filename handling for uploads and downloads.
//!
//! Every user-supplied name passes through [`sanitize_filename`] before
//! it touches the state actor or a response header. The function is
//! idempotent: feeding its output back in returns the same string.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Maximum UTF-8 byte length of a sanitized filename.
pub const MAX_FILENAME_BYTES: usize = 200;

/// Maximum byte length of the ASCII fallback used in `Content-Disposition`.
pub const MAX_FALLBACK_BYTES: usize = 120;

/// Maximum byte length of an extension carried into an object key,
/// including the leading dot.
const MAX_EXTENSION_BYTES: usize = 16;

/// Characters escaped in the RFC 5987 `filename*` form.
///
/// Everything outside the attr-char set (ALPHA / DIGIT and the marks
/// below) is percent-encoded.
const RFC5987_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

/// Sanitize a user-supplied filename.
///
/// Rules, applied in order:
/// - trim surrounding whitespace
/// - treat `\` as `/` and keep only the last path segment
/// - drop CR, LF, TAB, and NUL bytes
/// - replace `<>:"|?*` with `_`
/// - collapse whitespace runs to a single space
/// - trim trailing dots and spaces
/// - reject the empty string, `.`, and `..`
/// - truncate to at most [`MAX_FILENAME_BYTES`] UTF-8 bytes, backing off
///   to the previous character boundary
///
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let unified = raw.trim().replace('\\', "/");
    let last_segment = unified.rsplit('/').next().unwrap_or("");

    let mut cleaned = String::with_capacity(last_segment.len());
    for c in last_segment.chars() {
        match c {
            '\r' | '\n' | '\t' | '\0' => {}
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => cleaned.push('_'),
            _ => cleaned.push(c),
        }
    }

    let mut collapsed = String::with_capacity(cleaned.len());
    let mut in_whitespace = false;
    for c in cleaned.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    let trimmed = collapsed.trim_end_matches(['.', ' ']).trim_start();
    if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
        return None;
    }

    // Truncation can land on a trailing dot or space again; re-trim so the
    // result survives a second pass unchanged.
    let truncated = truncate_utf8(trimmed, MAX_FILENAME_BYTES);
    let result = truncated.trim_end_matches(['.', ' ']);
    if result.is_empty() {
        return None;
    }
    Some(result.to_string())
}

/// Truncate `s` to at most `max` bytes without splitting a character.
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Extract the trailing extension of a filename, including the leading
/// dot, for embedding in object keys.
///
/// Only short ASCII-alphanumeric extensions qualify; anything else maps
/// to the empty string. The object key is a debugging aid — the filename
/// in token metadata stays authoritative.
pub fn extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            let ext = &filename[idx..];
            if ext.len() <= MAX_EXTENSION_BYTES && ext[1..].bytes().all(|b| b.is_ascii_alphanumeric())
            {
                ext
            } else {
                ""
            }
        }
        _ => "",
    }
}

/// Reduce a filename to the printable-ASCII fallback form used in the
/// quoted `filename=` parameter of `Content-Disposition`.
///
/// Non-ASCII characters, `"`, and `\` become `_`; the result is capped
/// at [`MAX_FALLBACK_BYTES`] bytes and defaults to `download` when
/// nothing printable remains.
pub fn ascii_fallback(filename: &str) -> String {
    let mut out = String::new();
    for c in filename.chars() {
        if out.len() >= MAX_FALLBACK_BYTES {
            break;
        }
        match c {
            '"' | '\\' => out.push('_'),
            c if c == ' ' || c.is_ascii_graphic() => out.push(c),
            _ => out.push('_'),
        }
    }
    if out.is_empty() {
        "download".to_string()
    } else {
        out
    }
}

/// Percent-encode a value for the RFC 5987 `filename*=UTF-8''…` form.
pub fn rfc5987_encode(value: &str) -> String {
    utf8_percent_encode(value, RFC5987_ESCAPE).to_string()
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod tests;
