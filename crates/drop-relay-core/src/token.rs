//! # Token Generation
//!
//! Opaque download tokens and their blob store keys.

use crate::sanitize::extension;

/// Prefix under which all relay blobs live in the blob store.
pub const OBJECT_PREFIX: &str = "obj/";

/// Generate a new opaque, URL-safe token.
///
/// 16 bytes of OS entropy rendered as 32 lowercase hex characters, so
/// every token carries 128 bits and needs no further encoding anywhere
/// it appears (URLs, object keys, persisted state).
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Build the blob store key for a token.
///
/// The sanitized filename's extension (if any) rides along for
/// readability when listing the store; the filename in token metadata
/// stays authoritative.
pub fn object_key(token: &str, filename: &str) -> String {
    format!("{}{}{}", OBJECT_PREFIX, token, extension(filename))
}

#[cfg(test)]
#[path = "token_tests.rs"]
mod tests;
