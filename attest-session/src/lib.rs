//! Session lifecycle facade for the Attest security core.
//!
//! The surrounding authentication flow calls [`SecuritySession::initialize`]
//! at login and [`SecuritySession::destroy`] at logout. In between, domain
//! services (evidence handling, vendor records, access-token issuance) reach
//! every cryptographic guarantee through the three accessors — there is no
//! other path to key material.
//!
//! Each session owns its layers outright. Two concurrent sessions share
//! nothing; a destroyed session leaves every key-requiring operation failing
//! with a key-unavailable error.

use attest_crypto::{derive_session_material, CryptoEngine};
use attest_storage::{SecureStorage, StorageConfig};
use attest_transport::{SecureTransport, TransportConfig};
use thiserror::Error;
use tracing::debug;

/// Result type for session lifecycle operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors raised while wiring a session together.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("crypto error: {0}")]
    Crypto(#[from] attest_crypto::CryptoError),
}

/// One authenticated session's security services.
pub struct SecuritySession {
    crypto: CryptoEngine,
    storage: SecureStorage,
    transport: SecureTransport,
}

impl SecuritySession {
    /// Wires up a session with default transport and storage configuration.
    pub async fn initialize(user_id: &str, session_token: &str) -> SessionResult<Self> {
        Self::initialize_with_config(
            user_id,
            session_token,
            TransportConfig::default(),
            StorageConfig::default(),
        )
        .await
    }

    /// Derives the session key material and constructs the three layers:
    /// a crypto engine holding the encryption key, storage initialized with
    /// the storage key, and transport holding the signing and encryption
    /// keys.
    pub async fn initialize_with_config(
        user_id: &str,
        session_token: &str,
        transport_config: TransportConfig,
        storage_config: StorageConfig,
    ) -> SessionResult<Self> {
        let material = derive_session_material(user_id, session_token)?;

        let crypto = CryptoEngine::with_session_key(material.encryption_key().clone());

        let storage = SecureStorage::new(storage_config);
        storage.initialize_with_key(material.storage_key().clone());

        let transport = SecureTransport::new(transport_config);
        transport
            .initialize(
                material.signing_key().clone(),
                Some(material.encryption_key().clone()),
            )
            .await;

        debug!("security session initialized for user {user_id}");
        Ok(Self {
            crypto,
            storage,
            transport,
        })
    }

    pub fn crypto(&self) -> &CryptoEngine {
        &self.crypto
    }

    pub fn storage(&self) -> &SecureStorage {
        &self.storage
    }

    pub fn transport(&self) -> &SecureTransport {
        &self.transport
    }

    /// Tears the session down: transport keys and nonce cache dropped, the
    /// session storage tier cleared, crypto keys zeroized. Key-requiring
    /// operations fail afterwards.
    pub async fn destroy(&self) {
        self.transport.destroy().await;
        self.storage.end_session();
        self.crypto.clear_keys();
        debug!("security session destroyed");
    }
}
