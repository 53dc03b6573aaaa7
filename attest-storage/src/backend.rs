//! Storage backends.
//!
//! [`StorageBackend`] is the seam a platform adapter implements (filesystem,
//! browser storage, keychain). [`MemoryBackend`] is the default in-process
//! implementation and the one tests use; its optional byte quota models the
//! hard limits real platform stores impose.

use crate::error::{StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Raw string-keyed storage under the secure overlay.
///
/// Implementations store opaque serialized records; all policy, expiry, and
/// encryption logic lives above this trait.
pub trait StorageBackend: Send + Sync {
    /// Inserts or replaces a value. Fails with
    /// [`StorageError::QuotaExceeded`] when the write would overflow the
    /// backend's capacity.
    fn put(&self, key: &str, value: String) -> StorageResult<()>;

    fn get(&self, key: &str) -> Option<String>;

    /// Removes a key, reporting whether it was present. Idempotent.
    fn remove(&self, key: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    fn clear(&self);

    /// Approximate bytes consumed: key lengths plus value lengths.
    fn used_bytes(&self) -> usize;
}

/// In-memory backend with an optional byte quota.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: None,
        }
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for MemoryBackend {
    fn put(&self, key: &str, value: String) -> StorageResult<()> {
        let mut entries = self.entries.write().unwrap();

        if let Some(quota) = self.quota_bytes {
            let current: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let prospective = current + key.len() + value.len();
            if prospective > quota {
                return Err(StorageError::QuotaExceeded {
                    used: prospective,
                    quota,
                });
            }
        }

        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn remove(&self, key: &str) -> bool {
        self.entries.write().unwrap().remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.read().unwrap().keys().cloned().collect()
    }

    fn clear(&self) {
        self.entries.write().unwrap().clear();
    }

    fn used_bytes(&self) -> usize {
        self.entries
            .read()
            .unwrap()
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}
