//! Key derivation and the bounded derivation cache.
//!
//! PBKDF2-HMAC-SHA256 converts a passphrase and salt into a 256-bit key.
//! Derivation is deterministic: the same passphrase, salt, and iteration
//! count always yield the same key, which is what allows a payload encrypted
//! under a passphrase to be decrypted later from its embedded salt.

use crate::error::{CryptoError, CryptoResult};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of derived keys in bytes (256 bits, AES-256).
pub const KEY_SIZE: usize = 32;

/// Length of the KDF salt in bytes (128 bits).
pub const SALT_SIZE: usize = 16;

/// Default PBKDF2 iteration count.
const DEFAULT_ITERATIONS: u32 = 100_000;

/// Iteration floor; anything lower is rejected as dangerously weak.
const MIN_ITERATIONS: u32 = 1_000;

/// A 128-bit KDF salt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh random salt.
    pub fn random() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// PBKDF2 parameters.
#[derive(Debug, Clone, Copy)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// An in-memory 256-bit key handle.
///
/// Not serializable and never logged; the raw bytes are zeroized when the
/// handle is dropped. `Debug` deliberately redacts the contents.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; KEY_SIZE]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(<redacted>)")
    }
}

/// Derives a 256-bit key from a passphrase and salt using PBKDF2-HMAC-SHA256.
///
/// Deterministic: identical inputs always yield bit-identical keys.
pub fn derive_key(passphrase: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<DerivedKey> {
    if passphrase.is_empty() {
        return Err(CryptoError::KeyDerivation(
            "passphrase must not be empty".to_string(),
        ));
    }
    if params.iterations < MIN_ITERATIONS {
        return Err(CryptoError::KeyDerivation(format!(
            "iteration count must be at least {MIN_ITERATIONS} (got {})",
            params.iterations
        )));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        passphrase.as_bytes(),
        salt.as_bytes(),
        params.iterations,
        &mut key,
    );
    Ok(DerivedKey(key))
}

/// Generates a random 256-bit key.
pub fn generate_random_key() -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::rng().fill_bytes(&mut bytes);
    DerivedKey(bytes)
}

/// Generates a fresh random salt.
pub fn generate_salt() -> Salt {
    Salt::random()
}

/// Cache key: (SHA-256 of the passphrase, salt bytes).
///
/// The raw passphrase is never stored, only its digest.
type CacheKey = ([u8; 32], [u8; SALT_SIZE]);

/// Bounded cache of derived keys, evicting the oldest-inserted entry.
///
/// PBKDF2 at 100k iterations is deliberately slow; the cache amortizes the
/// cost when the same (passphrase, salt) pair is used repeatedly within a
/// session. Oldest-inserted eviction is an accepted approximation of LRU.
pub struct KeyCache {
    capacity: usize,
    entries: VecDeque<(CacheKey, DerivedKey)>,
}

impl KeyCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Returns the cached key for (passphrase, salt), deriving and inserting
    /// it on a miss.
    pub fn get_or_derive(
        &mut self,
        passphrase: &str,
        salt: &Salt,
        params: &KdfParams,
    ) -> CryptoResult<DerivedKey> {
        let cache_key: CacheKey = (
            Sha256::digest(passphrase.as_bytes()).into(),
            *salt.as_bytes(),
        );

        if let Some((_, key)) = self.entries.iter().find(|(k, _)| *k == cache_key) {
            return Ok(key.clone());
        }

        let key = derive_key(passphrase, salt, params)?;
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((cache_key, key.clone()));
        Ok(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every cached key. Entries zeroize on drop.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
