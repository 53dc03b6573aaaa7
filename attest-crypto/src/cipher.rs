//! AES-256-GCM authenticated encryption and the versioned payload format.
//!
//! Every encryption call uses a fresh random 96-bit IV and carries the
//! 128-bit KDF salt used (or usable) to derive its key, so a payload is
//! self-describing: salt + passphrase is all a holder needs to decrypt.
//!
//! Serialized form (persisted and transmitted):
//! `{ ciphertext, iv, salt: base64, algorithm: "AES-GCM", version: 1 }`.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, Salt, SALT_SIZE};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Payload format version this build reads and writes.
pub const FORMAT_VERSION: u8 = 1;

/// The single cipher the format admits. Anything else is rejected on decode.
pub const ALGORITHM: &str = "AES-GCM";

/// AES-GCM IV length in bytes (96 bits).
pub const IV_SIZE: usize = 12;

/// An authenticated, versioned ciphertext envelope.
///
/// The Poly-style GCM authentication tag is embedded at the end of
/// `ciphertext` (the `aes-gcm` crate appends it during encryption).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Ciphertext with the 16-byte GCM tag appended.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
    /// Fresh random 96-bit IV, never reused across calls.
    #[serde(with = "b64_fixed")]
    pub iv: [u8; IV_SIZE],
    /// Fresh random 128-bit KDF salt.
    #[serde(with = "b64_fixed")]
    pub salt: [u8; SALT_SIZE],
    /// Cipher identifier; fixed to `"AES-GCM"`.
    pub algorithm: String,
    /// Format version; a mismatch is always rejected, never coerced.
    pub version: u8,
}

impl EncryptedPayload {
    /// Returns the embedded salt as a typed value.
    pub fn salt(&self) -> Salt {
        Salt::from_bytes(self.salt)
    }
}

/// Encrypts `plaintext` under `key`, stamping the payload with `salt`.
///
/// The salt is carried for later key re-derivation; it plays no part in the
/// cipher operation itself. A fresh IV is generated on every call.
pub fn encrypt_with_key(
    key: &DerivedKey,
    plaintext: &[u8],
    salt: &Salt,
) -> CryptoResult<EncryptedPayload> {
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("invalid key length: {e}")))?;

    let mut iv = [0u8; IV_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

    Ok(EncryptedPayload {
        ciphertext,
        iv,
        salt: *salt.as_bytes(),
        algorithm: ALGORITHM.to_string(),
        version: FORMAT_VERSION,
    })
}

/// Decrypts a payload with `key`.
///
/// Fails with [`CryptoError::VersionMismatch`] for an unsupported format
/// version, [`CryptoError::UnsupportedAlgorithm`] for a foreign cipher tag,
/// and [`CryptoError::IntegrityFailure`] when tag verification fails.
/// Never returns partially-decrypted data.
pub fn decrypt_with_key(key: &DerivedKey, payload: &EncryptedPayload) -> CryptoResult<Vec<u8>> {
    if payload.version != FORMAT_VERSION {
        return Err(CryptoError::VersionMismatch {
            expected: FORMAT_VERSION,
            actual: payload.version,
        });
    }
    if payload.algorithm != ALGORITHM {
        return Err(CryptoError::UnsupportedAlgorithm(payload.algorithm.clone()));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| CryptoError::Encryption(format!("invalid key length: {e}")))?;

    cipher
        .decrypt(Nonce::from_slice(&payload.iv), payload.ciphertext.as_ref())
        .map_err(|_| CryptoError::IntegrityFailure)
}

/// Base64 serde adapter for variable-length binary fields.
mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
    }
}

/// Base64 serde adapter for fixed-length binary fields.
mod b64_fixed {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<const N: usize, S: Serializer>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, const N: usize, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(&encoded).map_err(serde::de::Error::custom)?;
        bytes.try_into().map_err(|v: Vec<u8>| {
            serde::de::Error::custom(format!("expected {N} bytes, got {}", v.len()))
        })
    }
}
