//! Encryption primitives for the Attest client.
//!
//! Provides the cryptographic base layer the rest of the client builds on:
//! - PBKDF2-HMAC-SHA256 for key derivation from passphrases
//! - AES-256-GCM for authenticated encryption
//! - SHA-256 hashing with constant-time integrity verification
//! - HMAC-SHA256 for message authentication
//! - Session key material derivation with domain separation
//!
//! # Architecture
//!
//! Keys come from one of two places:
//!
//! 1. **Explicit passphrase**: derived on demand via PBKDF2 and memoized in a
//!    bounded cache so repeated operations against the same passphrase/salt
//!    pair do not pay the derivation cost twice.
//!
//! 2. **Session key**: derived once at login from the user identity and the
//!    session secret, held only in memory, and zeroized at logout.
//!
//! The [`CryptoEngine`] is an explicit per-session object rather than a
//! process-wide singleton, so tests and concurrent sessions each construct
//! their own instance with no shared state.

mod cipher;
mod engine;
mod error;
pub mod integrity;
mod key;
mod password;
mod session;

pub use cipher::{
    decrypt_with_key, encrypt_with_key, EncryptedPayload, ALGORITHM, FORMAT_VERSION, IV_SIZE,
};
pub use engine::{CryptoEngine, KeySource};
pub use error::{CryptoError, CryptoResult};
pub use integrity::{constant_time_eq, hash, hash_hex, hmac_sha256, verify_integrity};
pub use key::{
    derive_key, generate_random_key, generate_salt, DerivedKey, KdfParams, KeyCache, KEY_SIZE,
    SALT_SIZE, Salt,
};
pub use password::generate_secure_password;
pub use session::{derive_session_material, SessionKeyMaterial};
