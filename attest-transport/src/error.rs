//! Transport error types.

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur in secure transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Signing or encryption was requested but the transport holds no key
    /// for it. Fatal to that call; never retried.
    #[error("no key material available for the requested operation")]
    KeyUnavailable,

    /// The request deadline elapsed and the call was cancelled. Retried per
    /// policy; surfaced once retries are exhausted. Never a partial success.
    #[error("request timed out")]
    Timeout,

    /// A nonce was seen twice, or a timestamp fell outside the replay
    /// window. Logged as a potential attack; never retried.
    #[error("replay detected for nonce {nonce}")]
    ReplayDetected { nonce: String },

    /// A signature failed verification on an inbound message.
    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("crypto error: {0}")]
    Crypto(#[from] attest_crypto::CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
