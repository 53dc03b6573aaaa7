//! The per-session encryption engine.

use crate::cipher::{decrypt_with_key, encrypt_with_key, EncryptedPayload};
use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KdfParams, KeyCache, Salt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Mutex, RwLock};

/// Bounded capacity of the passphrase-derived key cache.
const KEY_CACHE_CAPACITY: usize = 32;

/// Where the key for an operation comes from.
///
/// Every key-requiring operation takes one of these and fails fast with
/// [`CryptoError::KeyUnavailable`] on `Unavailable` — no implicit fallback.
#[derive(Clone, Copy, Debug)]
pub enum KeySource<'a> {
    /// Derive the key from an explicit passphrase (cached per salt).
    Explicit(&'a str),
    /// Use the engine's active session key.
    Session,
    /// No key material. Always fails.
    Unavailable,
}

impl<'a> KeySource<'a> {
    /// Maps the optional-passphrase calling convention onto an explicit
    /// source: a passphrase wins, otherwise the session key is used.
    pub fn from_passphrase(passphrase: Option<&'a str>) -> Self {
        match passphrase {
            Some(p) => KeySource::Explicit(p),
            None => KeySource::Session,
        }
    }
}

/// Authenticated encryption engine scoped to one session.
///
/// Constructed at login and dropped at logout; there is no process-wide
/// instance. Safe for concurrent use: the key cache and the session key slot
/// are the only mutable state, both behind their own locks.
pub struct CryptoEngine {
    session_key: RwLock<Option<DerivedKey>>,
    cache: Mutex<KeyCache>,
    params: KdfParams,
}

impl CryptoEngine {
    pub fn new() -> Self {
        Self {
            session_key: RwLock::new(None),
            cache: Mutex::new(KeyCache::new(KEY_CACHE_CAPACITY)),
            params: KdfParams::default(),
        }
    }

    /// Creates an engine holding an active session key.
    pub fn with_session_key(key: DerivedKey) -> Self {
        let engine = Self::new();
        engine.set_session_key(key);
        engine
    }

    pub fn set_session_key(&self, key: DerivedKey) {
        *self.session_key.write().unwrap() = Some(key);
    }

    pub fn has_session_key(&self) -> bool {
        self.session_key.read().unwrap().is_some()
    }

    /// Drops the session key and every cached derived key.
    ///
    /// Subsequent key-requiring calls without an explicit passphrase fail
    /// with [`CryptoError::KeyUnavailable`]. Dropped keys zeroize.
    pub fn clear_keys(&self) {
        *self.session_key.write().unwrap() = None;
        self.cache.lock().unwrap().clear();
    }

    /// Encrypts `plaintext`, generating a fresh salt and IV.
    pub fn encrypt(&self, plaintext: &[u8], source: KeySource<'_>) -> CryptoResult<EncryptedPayload> {
        let salt = Salt::random();
        let key = self.resolve_key(source, &salt)?;
        encrypt_with_key(&key, plaintext, &salt)
    }

    /// Decrypts a payload, re-deriving the key from the embedded salt when
    /// an explicit passphrase is supplied.
    pub fn decrypt(&self, payload: &EncryptedPayload, source: KeySource<'_>) -> CryptoResult<Vec<u8>> {
        let key = self.resolve_key(source, &payload.salt())?;
        decrypt_with_key(&key, payload)
    }

    /// Serializes a value to JSON and encrypts it.
    pub fn encrypt_value<T: Serialize>(
        &self,
        value: &T,
        passphrase: Option<&str>,
    ) -> CryptoResult<EncryptedPayload> {
        let bytes = serde_json::to_vec(value)?;
        self.encrypt(&bytes, KeySource::from_passphrase(passphrase))
    }

    /// Decrypts a payload and deserializes the plaintext from JSON.
    pub fn decrypt_value<T: DeserializeOwned>(
        &self,
        payload: &EncryptedPayload,
        passphrase: Option<&str>,
    ) -> CryptoResult<T> {
        let bytes = self.decrypt(payload, KeySource::from_passphrase(passphrase))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn resolve_key(&self, source: KeySource<'_>, salt: &Salt) -> CryptoResult<DerivedKey> {
        match source {
            KeySource::Explicit(passphrase) => self
                .cache
                .lock()
                .unwrap()
                .get_or_derive(passphrase, salt, &self.params),
            KeySource::Session => self
                .session_key
                .read()
                .unwrap()
                .clone()
                .ok_or(CryptoError::KeyUnavailable),
            KeySource::Unavailable => Err(CryptoError::KeyUnavailable),
        }
    }
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self::new()
    }
}
