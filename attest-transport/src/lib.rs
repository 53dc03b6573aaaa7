//! Secure transport for the Attest client.
//!
//! Wraps outbound request/response exchanges with:
//! - HMAC-SHA256 message signing over (timestamp, nonce, payload)
//! - Optional AES-GCM payload encryption
//! - Replay protection (random nonce + bounded timestamp window)
//! - Retry with exponential backoff and jitter
//! - Per-request timeouts that surface as a distinct error
//!
//! The signing and replay checks here are one half of a mutual protocol:
//! a compliant server recomputes the same HMAC over the identical tuple and
//! applies the same replay window.

pub mod client;
pub mod config;
pub mod error;
pub mod nonce;
pub mod signing;

pub use client::{RequestOptions, SecureTransport, TransportResponse};
pub use config::TransportConfig;
pub use error::{TransportError, TransportResult};
pub use nonce::NonceCache;
