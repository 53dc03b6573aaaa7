//! Secure storage overlay for the Attest client.
//!
//! A key-value layer that classifies every value by sensitivity, selectively
//! encrypts at rest through `attest-crypto`, enforces expiry, and recovers
//! from quota pressure. Two tiers back it:
//!
//! - **Durable**: survives across sessions (public/internal/confidential).
//! - **Session**: dropped when the session ends (restricted).
//!
//! This store is a best-effort, non-authoritative cache. Corrupted,
//! expired, and version-mismatched entries are purged and reported as
//! absent rather than raised; callers re-derive or re-fetch lost values.
//! Classification is fail-closed: a value whose policy requires encryption
//! is never written in cleartext, even when no key is available.

mod backend;
mod error;
mod policy;
mod record;
mod store;

pub use backend::{MemoryBackend, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use policy::{Sensitivity, StoragePolicy, Tier};
pub use record::{StoredPayload, StoredRecord, RECORD_VERSION};
pub use store::{SecureStorage, SetOptions, StorageConfig};
