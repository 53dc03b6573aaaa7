//! The on-disk record wrapper.

use attest_crypto::EncryptedPayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written with every record. Records carrying any other
/// version are discarded on read.
pub const RECORD_VERSION: u32 = 1;

/// A stored value, either in the clear or as an authenticated ciphertext.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredPayload {
    Encrypted(EncryptedPayload),
    Plain(serde_json::Value),
}

/// Envelope written to a backend for every item.
///
/// Replaced wholesale on overwrite; there is no partial update.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRecord {
    pub payload: StoredPayload,
    pub encrypted: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub version: u32,
}

impl StoredRecord {
    /// True once the record has passed its expiry instant.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
