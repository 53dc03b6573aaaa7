//! The secure HTTP transport.

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportResult};
use crate::nonce::NonceCache;
use crate::signing::{
    self, ENCRYPTED_HEADER, NONCE_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use attest_crypto::{encrypt_with_key, generate_salt, DerivedKey};
use chrono::Utc;
use rand::Rng;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

/// Session-scoped transport keys.
struct SessionKeys {
    signing: DerivedKey,
    encryption: Option<DerivedKey>,
}

/// Per-call options for [`SecureTransport::post`] and
/// [`SecureTransport::get`].
#[derive(Clone, Debug)]
pub struct RequestOptions {
    /// Wrap the body as an `EncryptedPayload` before sending.
    pub encrypt: bool,
    /// Attach timestamp/nonce/signature headers.
    pub sign: bool,
    /// Override the configured per-request deadline.
    pub timeout: Option<Duration>,
    /// Override the configured retry budget.
    pub retries: Option<u32>,
    /// Extra headers appended to the request.
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            encrypt: false,
            sign: true,
            timeout: None,
            retries: None,
            headers: Vec::new(),
        }
    }
}

/// Uniform result of a transport exchange.
///
/// Non-2xx responses are reported here with `success: false` rather than as
/// errors; only timeouts, connection failures, and local key/serialization
/// problems surface as [`TransportError`].
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub status_code: u16,
    /// Whether a signature was actually attached to the request.
    pub verified: bool,
}

/// Signed, replay-protected HTTP client scoped to one session.
pub struct SecureTransport {
    client: Client,
    config: TransportConfig,
    keys: Arc<RwLock<Option<SessionKeys>>>,
    nonces: Arc<Mutex<NonceCache>>,
}

impl SecureTransport {
    pub fn new(config: TransportConfig) -> Self {
        let client = Client::builder()
            .build()
            .expect("failed to build HTTP client");
        let nonces = NonceCache::new(config.replay_window, config.nonce_cache_max);

        Self {
            client,
            config,
            keys: Arc::new(RwLock::new(None)),
            nonces: Arc::new(Mutex::new(nonces)),
        }
    }

    /// Installs session-scoped keys. Signing is mandatory; payload
    /// encryption is optional.
    pub async fn initialize(&self, signing_key: DerivedKey, encryption_key: Option<DerivedKey>) {
        let mut keys = self.keys.write().await;
        *keys = Some(SessionKeys {
            signing: signing_key,
            encryption: encryption_key,
        });
    }

    pub async fn is_initialized(&self) -> bool {
        self.keys.read().await.is_some()
    }

    /// Drops signing/encryption keys and clears the nonce cache.
    pub async fn destroy(&self) {
        *self.keys.write().await = None;
        self.nonces.lock().await.clear();
        debug!("transport keys destroyed and nonce cache cleared");
    }

    /// Sends a signed (and optionally encrypted) POST.
    pub async fn post<T: Serialize>(
        &self,
        url: &str,
        data: &T,
        options: RequestOptions,
    ) -> TransportResult<TransportResponse> {
        let serialized = serde_json::to_string(data)?;
        let (body, encrypted) = if options.encrypt {
            let key = self.encryption_key().await?;
            let payload = encrypt_with_key(&key, serialized.as_bytes(), &generate_salt())?;
            (serde_json::to_string(&payload)?, true)
        } else {
            (serialized, false)
        };
        self.execute(Method::POST, url, Some(body), encrypted, &options)
            .await
    }

    /// Sends a signed, bodyless GET. The signed message covers the method
    /// and URL in place of a payload.
    pub async fn get(&self, url: &str, options: RequestOptions) -> TransportResult<TransportResponse> {
        self.execute(Method::GET, url, None, false, &options).await
    }

    /// Computes the hex HMAC-SHA256 signature of a message under the
    /// session signing key.
    pub async fn sign_message(&self, message: &str) -> TransportResult<String> {
        let key = self.signing_key().await?;
        signing::sign(&key, message)
    }

    /// Recomputes the expected HMAC and compares in constant time — the
    /// contract a receiving party must implement to accept a signed request.
    pub async fn verify_signature(&self, message: &str, signature: &str) -> TransportResult<bool> {
        let key = self.signing_key().await?;
        signing::verify(&key, message, signature)
    }

    /// Replay check and record.
    ///
    /// Rejects when `|now − timestamp|` exceeds the replay window or the
    /// nonce was already observed within it; fresh nonces are recorded.
    pub async fn is_replay_attack(&self, nonce: &str, timestamp_millis: i64) -> bool {
        let now = Utc::now().timestamp_millis();
        let replay = self
            .nonces
            .lock()
            .await
            .check_and_record(nonce, timestamp_millis, now);
        if replay {
            warn!("potential replay attack: nonce {nonce} at timestamp {timestamp_millis}");
        }
        replay
    }

    /// Full inbound acceptance: replay check, then signature verification.
    ///
    /// Replay and integrity failures are surfaced as distinct errors and are
    /// never retried or repaired.
    pub async fn accept_signed(
        &self,
        message: &str,
        signature: &str,
        nonce: &str,
        timestamp_millis: i64,
    ) -> TransportResult<()> {
        if self.is_replay_attack(nonce, timestamp_millis).await {
            return Err(TransportError::ReplayDetected {
                nonce: nonce.to_string(),
            });
        }
        if !self.verify_signature(message, signature).await? {
            return Err(TransportError::SignatureInvalid);
        }
        Ok(())
    }

    async fn signing_key(&self) -> TransportResult<DerivedKey> {
        self.keys
            .read()
            .await
            .as_ref()
            .map(|k| k.signing.clone())
            .ok_or(TransportError::KeyUnavailable)
    }

    async fn encryption_key(&self) -> TransportResult<DerivedKey> {
        self.keys
            .read()
            .await
            .as_ref()
            .and_then(|k| k.encryption.clone())
            .ok_or(TransportError::KeyUnavailable)
    }

    /// Retry loop shared by GET and POST.
    ///
    /// Timestamp, nonce, and signature are regenerated per attempt so a
    /// retried request is a fresh message under the replay protocol, not a
    /// replay of the failed one.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<String>,
        encrypted: bool,
        options: &RequestOptions,
    ) -> TransportResult<TransportResponse> {
        let timeout = options.timeout.unwrap_or(self.config.timeout);
        let retries = options.retries.unwrap_or(self.config.retries);
        let mut last_err: Option<TransportError> = None;

        for attempt in 0..=retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt - 1);
                debug!("retrying {method} {url} in {delay:?} (attempt {attempt})");
                tokio::time::sleep(delay).await;
            }

            let timestamp = Utc::now().timestamp_millis();
            let nonce = signing::generate_nonce();
            let mut verified = false;

            let mut req = self
                .client
                .request(method.clone(), url)
                .header(TIMESTAMP_HEADER, timestamp.to_string())
                .header(NONCE_HEADER, &nonce);

            if encrypted {
                req = req.header(ENCRYPTED_HEADER, "true");
            }
            for (name, value) in &options.headers {
                req = req.header(name, value);
            }

            if options.sign {
                let message = if method == Method::GET {
                    signing::get_message(timestamp, &nonce, url)
                } else {
                    signing::post_message(timestamp, &nonce, body.as_deref().unwrap_or(""))
                };
                let signature = self.sign_message(&message).await?;
                req = req.header(SIGNATURE_HEADER, signature);
                verified = true;
            }

            if let Some(b) = &body {
                req = req
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(b.clone());
            }

            match tokio::time::timeout(timeout, req.send()).await {
                Err(_) => {
                    warn!("{method} {url} timed out after {timeout:?} (attempt {attempt})");
                    last_err = Some(TransportError::Timeout);
                }
                Ok(Err(e)) => {
                    warn!("{method} {url} failed: {e} (attempt {attempt})");
                    last_err = Some(TransportError::Http(e));
                }
                Ok(Ok(resp)) => {
                    let status = resp.status();
                    if is_retryable_status(status) && attempt < retries {
                        warn!("{method} {url} returned {status}, will retry");
                        continue;
                    }
                    return Ok(into_response(resp, verified).await);
                }
            }
        }

        Err(last_err.unwrap_or(TransportError::Timeout))
    }

    /// `base * 2^attempt` plus uniform jitter in `[0, base)`, so independent
    /// callers hitting the same failing endpoint do not retry in lockstep.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base.as_millis().max(1) as u64;
        let exp = base.saturating_mul(1u64 << attempt.min(16));
        let jitter = rand::rng().random_range(0..base);
        Duration::from_millis(exp.saturating_add(jitter))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

async fn into_response(resp: reqwest::Response, verified: bool) -> TransportResponse {
    let status = resp.status();
    let data = resp.json::<serde_json::Value>().await.ok();

    if status.is_success() {
        TransportResponse {
            success: true,
            data,
            error: None,
            status_code: status.as_u16(),
            verified,
        }
    } else {
        let error = data
            .as_ref()
            .and_then(|d| d.get("error"))
            .and_then(|e| e.as_str())
            .map(String::from)
            .unwrap_or_else(|| format!("HTTP {status}"));
        TransportResponse {
            success: false,
            data,
            error: Some(error),
            status_code: status.as_u16(),
            verified,
        }
    }
}
