//! Request signing helpers and the signed-message wire format.
//!
//! Signed tuples:
//! - POST: `"{timestamp}.{nonce}.{serialized_payload}"`
//! - GET:  `"{timestamp}.{nonce}.GET.{url}"`
//!
//! Signatures travel as lowercase hex HMAC-SHA256 in `X-Request-Signature`;
//! the timestamp (epoch millis) and nonce (32 hex chars) travel in their own
//! headers.

use attest_crypto::{constant_time_eq, hmac_sha256, DerivedKey};
use rand::RngCore;

use crate::error::TransportResult;

/// Header carrying the epoch-millisecond timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Request-Timestamp";
/// Header carrying the 128-bit request nonce as hex.
pub const NONCE_HEADER: &str = "X-Request-Nonce";
/// Header carrying the hex HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-Request-Signature";
/// Marker header present when the body is an encrypted payload.
pub const ENCRYPTED_HEADER: &str = "X-Encrypted";

/// Generates a fresh 128-bit nonce as 32 hex characters.
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// The signed message for a POST exchange.
pub fn post_message(timestamp_millis: i64, nonce: &str, serialized_payload: &str) -> String {
    format!("{timestamp_millis}.{nonce}.{serialized_payload}")
}

/// The signed message for a bodyless GET exchange.
pub fn get_message(timestamp_millis: i64, nonce: &str, url: &str) -> String {
    format!("{timestamp_millis}.{nonce}.GET.{url}")
}

/// Computes the hex HMAC-SHA256 signature of a message.
pub fn sign(key: &DerivedKey, message: &str) -> TransportResult<String> {
    let tag = hmac_sha256(key.as_bytes(), message.as_bytes())?;
    Ok(hex::encode(tag))
}

/// Recomputes the expected HMAC and compares in constant time.
///
/// This is the exact check a receiving party must implement to accept a
/// signed request. Malformed hex verifies as false, not as an error.
pub fn verify(key: &DerivedKey, message: &str, signature_hex: &str) -> TransportResult<bool> {
    let expected = hmac_sha256(key.as_bytes(), message.as_bytes())?;
    let Ok(provided) = hex::decode(signature_hex) else {
        return Ok(false);
    };
    Ok(constant_time_eq(&expected, &provided))
}
