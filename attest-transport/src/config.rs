//! Transport configuration.

use std::time::Duration;

/// Configuration for [`crate::SecureTransport`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Per-request deadline. Overridable per call.
    pub timeout: Duration,

    /// Retry budget for timeouts and server-side failures. Overridable
    /// per call.
    pub retries: u32,

    /// Base unit for exponential backoff: `base * 2^attempt + jitter`.
    pub backoff_base: Duration,

    /// How far a signed message's timestamp may drift from local time
    /// before it is rejected as a replay.
    pub replay_window: Duration,

    /// Upper bound on remembered nonces; the oldest time bucket is evicted
    /// when the bound is exceeded.
    pub nonce_cache_max: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 3,
            backoff_base: Duration::from_millis(250),
            replay_window: Duration::from_secs(5 * 60),
            nonce_cache_max: 10_000,
        }
    }
}
