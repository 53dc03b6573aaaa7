//! Hashing, HMAC, and constant-time comparison helpers.
//!
//! Kept separate from encryption and key derivation to avoid accidental API
//! misuse: nothing here handles confidentiality, only authenticity.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{CryptoError, CryptoResult};

type HmacSha256 = Hmac<Sha256>;

/// Produces a raw SHA-256 digest of the provided bytes.
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Returns the hexadecimal representation of a SHA-256 digest.
pub fn hash_hex(data: &[u8]) -> String {
    hex::encode(hash(data))
}

/// Compares a digest against the expected value in constant time.
///
/// Timing-safe: the comparison does not short-circuit on the first
/// differing byte.
pub fn verify_integrity(data: &[u8], expected_digest: &[u8]) -> bool {
    let digest = hash(data);
    constant_time_eq(&digest, expected_digest)
}

/// Constant-time byte-slice equality.
///
/// Unequal lengths return false immediately; length is not secret here.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Generates an HMAC-SHA256 tag for the provided data.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| CryptoError::KeyDerivation(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
