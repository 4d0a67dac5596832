//! Base64 variant accepted by the edge network in query strings and cookies.
//!
//! Standard base64 with `+` -> `-`, `=` -> `_` and `/` -> `~`. Padding is
//! kept (as `_`), unlike RFC 4648 base64url.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Encode bytes for use as a `Policy` or `Signature` value.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD
        .encode(bytes)
        .chars()
        .map(|c| match c {
            '+' => '-',
            '=' => '_',
            '/' => '~',
            other => other,
        })
        .collect()
}

/// Inverse of [`encode`].
pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let standard: String = encoded
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '=',
            '~' => '/',
            other => other,
        })
        .collect();
    STANDARD.decode(standard)
}
