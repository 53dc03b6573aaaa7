//! Per-session key material.
//!
//! At login the client derives three independent keys from the user identity
//! and the session secret via HKDF-SHA256. Fixed context strings separate the
//! domains, so the signing, encryption, and storage keys are unrelated even
//! though they share the same inputs.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{DerivedKey, KEY_SIZE};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::ZeroizeOnDrop;

const SIGNING_CONTEXT: &[u8] = b"attest-signing";
const ENCRYPTION_CONTEXT: &[u8] = b"attest-encryption";
const STORAGE_CONTEXT: &[u8] = b"attest-storage";

/// The signing, encryption, and storage keys for one authenticated session.
///
/// Held only in memory and zeroized on drop. Destroying this material makes
/// every dependent key-requiring operation unavailable.
#[derive(ZeroizeOnDrop)]
pub struct SessionKeyMaterial {
    signing_key: DerivedKey,
    encryption_key: DerivedKey,
    storage_key: DerivedKey,
}

impl SessionKeyMaterial {
    pub fn signing_key(&self) -> &DerivedKey {
        &self.signing_key
    }

    pub fn encryption_key(&self) -> &DerivedKey {
        &self.encryption_key
    }

    pub fn storage_key(&self) -> &DerivedKey {
        &self.storage_key
    }
}

/// Derives session key material from (user identifier, session secret).
///
/// The user identifier acts as the HKDF salt, the session secret as the
/// input keying material. Identical inputs yield identical material, so both
/// protocol ends can derive the same keys independently.
pub fn derive_session_material(
    user_id: &str,
    session_secret: &str,
) -> CryptoResult<SessionKeyMaterial> {
    if user_id.is_empty() || session_secret.is_empty() {
        return Err(CryptoError::KeyDerivation(
            "user identifier and session secret must not be empty".to_string(),
        ));
    }

    let hk = Hkdf::<Sha256>::new(Some(user_id.as_bytes()), session_secret.as_bytes());

    let expand = |context: &[u8]| -> CryptoResult<DerivedKey> {
        let mut okm = [0u8; KEY_SIZE];
        hk.expand(context, &mut okm)
            .map_err(|e| CryptoError::KeyDerivation(format!("HKDF expand failed: {e}")))?;
        Ok(DerivedKey::from_bytes(okm))
    };

    Ok(SessionKeyMaterial {
        signing_key: expand(SIGNING_CONTEXT)?,
        encryption_key: expand(ENCRYPTION_CONTEXT)?,
        storage_key: expand(STORAGE_CONTEXT)?,
    })
}
