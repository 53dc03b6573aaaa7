//! The secure storage overlay.

use crate::backend::{MemoryBackend, StorageBackend};
use crate::error::{StorageError, StorageResult};
use crate::policy::{Sensitivity, Tier};
use crate::record::{StoredPayload, StoredRecord, RECORD_VERSION};
use attest_crypto::{derive_session_material, CryptoEngine, CryptoError, DerivedKey, KeySource};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the default in-memory backends.
#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    /// Byte quota for the durable tier (`None` = unbounded).
    pub durable_quota_bytes: Option<usize>,
    /// Byte quota for the session tier.
    pub session_quota_bytes: Option<usize>,
}

/// Per-write options.
#[derive(Clone, Copy, Debug, Default)]
pub struct SetOptions {
    /// Relative time-to-live; converted to an absolute expiry at write time.
    pub expires_in: Option<Duration>,
}

impl SetOptions {
    pub fn expires_in(ttl: Duration) -> Self {
        Self {
            expires_in: Some(ttl),
        }
    }
}

/// Sensitivity-classified key-value store over two tiers.
///
/// Writes are routed by the fixed policy table; reads check both tiers
/// because a key's classification may have changed since it was written.
/// All read-side failures (corruption, expiry, version mismatch, decrypt
/// failure) fold into "absent": the entry is purged and logged, never
/// raised.
pub struct SecureStorage {
    durable: Arc<dyn StorageBackend>,
    session: Arc<dyn StorageBackend>,
    engine: CryptoEngine,
}

impl SecureStorage {
    pub fn new(config: StorageConfig) -> Self {
        let backend = |quota: Option<usize>| -> Arc<dyn StorageBackend> {
            match quota {
                Some(bytes) => Arc::new(MemoryBackend::with_quota(bytes)),
                None => Arc::new(MemoryBackend::new()),
            }
        };
        Self {
            durable: backend(config.durable_quota_bytes),
            session: backend(config.session_quota_bytes),
            engine: CryptoEngine::new(),
        }
    }

    /// Builds a store over caller-supplied backends (platform adapters).
    pub fn with_backends(
        durable: Arc<dyn StorageBackend>,
        session: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            durable,
            session,
            engine: CryptoEngine::new(),
        }
    }

    /// Derives the storage-specific key from the session inputs and sweeps
    /// expired entries from both tiers.
    ///
    /// The storage key comes from the `"attest-storage"` HKDF context, so it
    /// is unrelated to the signing and encryption keys derived from the same
    /// inputs elsewhere.
    pub fn initialize(&self, user_id: &str, session_secret: &str) -> StorageResult<()> {
        let material = derive_session_material(user_id, session_secret)?;
        self.initialize_with_key(material.storage_key().clone());
        Ok(())
    }

    /// Installs an already-derived storage key and sweeps expired entries.
    pub fn initialize_with_key(&self, key: DerivedKey) {
        self.engine.set_session_key(key);
        let purged = self.purge_expired();
        if purged > 0 {
            debug!("initial sweep purged {purged} expired entries");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.has_session_key()
    }

    /// Writes a value under the policy of its classification.
    ///
    /// Encrypting classifications fail with [`StorageError::KeyUnavailable`]
    /// when no storage key is active — there is no cleartext fallback. On a
    /// quota failure the store purges expired entries and retries exactly
    /// once before propagating.
    pub fn set_item<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        sensitivity: Sensitivity,
        options: SetOptions,
    ) -> StorageResult<()> {
        let policy = sensitivity.policy();
        let now = Utc::now();

        let payload = if policy.encrypt {
            let bytes = serde_json::to_vec(value)?;
            let encrypted = self
                .engine
                .encrypt(&bytes, KeySource::Session)
                .map_err(|e| match e {
                    CryptoError::KeyUnavailable => StorageError::KeyUnavailable,
                    other => StorageError::Crypto(other),
                })?;
            StoredPayload::Encrypted(encrypted)
        } else {
            StoredPayload::Plain(serde_json::to_value(value)?)
        };

        let record = StoredRecord {
            payload,
            encrypted: policy.encrypt,
            created_at: now,
            expires_at: options.expires_in.map(|ttl| now + ttl),
            version: RECORD_VERSION,
        };
        let raw = serde_json::to_string(&record)?;

        let (target, other) = match policy.tier {
            Tier::Durable => (&self.durable, &self.session),
            Tier::Session => (&self.session, &self.durable),
        };

        match target.put(key, raw.clone()) {
            Ok(()) => {}
            Err(StorageError::QuotaExceeded { .. }) => {
                let purged = self.purge_expired();
                debug!("quota hit writing {key}, purged {purged} expired entries, retrying");
                target.put(key, raw)?;
            }
            Err(e) => return Err(e),
        }

        // Classification may have moved the key between tiers; the stale
        // copy must not shadow the new one.
        other.remove(key);
        Ok(())
    }

    /// Reads a value, checking both tiers.
    ///
    /// Returns `None` for missing, expired, corrupted, version-mismatched,
    /// or undecryptable entries; the offending entry is removed.
    pub fn get_item(&self, key: &str) -> Option<serde_json::Value> {
        for backend in [&self.durable, &self.session] {
            let Some(raw) = backend.get(key) else {
                continue;
            };

            let record: StoredRecord = match serde_json::from_str(&raw) {
                Ok(r) => r,
                Err(e) => {
                    warn!("discarding corrupted record {key}: {e}");
                    backend.remove(key);
                    continue;
                }
            };

            if record.version != RECORD_VERSION {
                warn!(
                    "discarding record {key} with unsupported version {}",
                    record.version
                );
                backend.remove(key);
                continue;
            }

            if record.is_expired(Utc::now()) {
                debug!("record {key} expired, removing");
                backend.remove(key);
                continue;
            }

            if record.encrypted != matches!(record.payload, StoredPayload::Encrypted(_)) {
                warn!("discarding record {key}: encrypted flag disagrees with payload");
                backend.remove(key);
                continue;
            }

            match record.payload {
                StoredPayload::Plain(value) => return Some(value),
                StoredPayload::Encrypted(payload) => {
                    match self.engine.decrypt(&payload, KeySource::Session) {
                        Ok(bytes) => match serde_json::from_slice(&bytes) {
                            Ok(value) => return Some(value),
                            Err(e) => {
                                warn!("discarding record {key} with invalid plaintext: {e}");
                                backend.remove(key);
                            }
                        },
                        Err(e) => {
                            // Stale key after rotation, or tampering. Either
                            // way the cache entry is unusable.
                            warn!("removing undecryptable record {key}: {e}");
                            backend.remove(key);
                        }
                    }
                }
            }
        }
        None
    }

    /// Removes a key from both tiers. Idempotent.
    pub fn remove_item(&self, key: &str) -> bool {
        let in_durable = self.durable.remove(key);
        let in_session = self.session.remove(key);
        in_durable || in_session
    }

    /// Expiry-aware existence check.
    pub fn contains(&self, key: &str) -> bool {
        self.get_item(key).is_some()
    }

    /// Removes every entry from both tiers.
    pub fn clear(&self) {
        self.durable.clear();
        self.session.clear();
    }

    /// Number of stored records across both tiers. Lazily-expired entries
    /// count until they are swept or touched.
    pub fn len(&self) -> usize {
        self.durable.keys().len() + self.session.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate bytes consumed across both tiers.
    pub fn used_bytes(&self) -> usize {
        self.durable.used_bytes() + self.session.used_bytes()
    }

    /// Removes expired and unparseable entries from both tiers, returning
    /// the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut purged = 0;
        for backend in [&self.durable, &self.session] {
            for key in backend.keys() {
                let Some(raw) = backend.get(&key) else {
                    continue;
                };
                let expired = match serde_json::from_str::<StoredRecord>(&raw) {
                    Ok(record) => record.is_expired(now),
                    Err(e) => {
                        warn!("purging unparseable record {key}: {e}");
                        true
                    }
                };
                if expired && backend.remove(&key) {
                    purged += 1;
                }
            }
        }
        purged
    }

    /// Ends the session: clears the session tier and drops the storage key.
    /// Durable entries survive for the next session.
    pub fn end_session(&self) {
        self.session.clear();
        self.engine.clear_keys();
    }
}
