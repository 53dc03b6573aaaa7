//! Crypto error types.

use thiserror::Error;

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No key material is available for an operation that requires one.
    /// Fatal to that call; never retried.
    #[error("no key material available for the requested operation")]
    KeyUnavailable,

    /// Authentication tag or digest mismatch. Indicates a wrong key or
    /// tampered data; always surfaced, never silently repaired.
    #[error("integrity check failed (wrong key or tampered data)")]
    IntegrityFailure,

    /// Payload carries a format version this build does not support.
    #[error("unsupported payload version: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// Payload names a cipher other than the one fixed by the format.
    #[error("unsupported cipher algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
