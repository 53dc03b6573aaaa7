//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in secure storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A classification requires encryption but no storage key is active.
    /// The write fails; cleartext is never stored as a fallback.
    #[error("no storage key available for an encrypted write")]
    KeyUnavailable,

    /// The backend is full. Surfaced only after one automatic
    /// purge-expired-and-retry cycle.
    #[error("storage quota exceeded: used {used} of {quota} bytes")]
    QuotaExceeded { used: usize, quota: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] attest_crypto::CryptoError),
}
