//! Replay protection: the time-bucketed nonce cache.
//!
//! Accepted nonces are recorded in per-minute buckets. On every insert,
//! buckets that have aged out of the replay window are dropped; when the
//! total count still exceeds the cap, whole oldest buckets are evicted.
//! Eviction is therefore incremental — there is no mass clear that would
//! momentarily reopen the replay window for in-window nonces.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

const BUCKET_MILLIS: i64 = 60_000;

/// Bounded record of recently observed nonces.
pub struct NonceCache {
    window_millis: i64,
    max_entries: usize,
    /// Minute bucket -> nonces first seen in that minute.
    buckets: BTreeMap<i64, HashSet<String>>,
    len: usize,
}

impl NonceCache {
    pub fn new(window: Duration, max_entries: usize) -> Self {
        Self {
            window_millis: window.as_millis() as i64,
            max_entries: max_entries.max(1),
            buckets: BTreeMap::new(),
            len: 0,
        }
    }

    /// Replay check and record, in one step.
    ///
    /// Returns `true` (replay) when the timestamp falls outside the window
    /// in either direction, or when the nonce was already observed inside
    /// the window. A fresh, in-window nonce is recorded and returns `false`.
    pub fn check_and_record(&mut self, nonce: &str, timestamp_millis: i64, now_millis: i64) -> bool {
        if (now_millis - timestamp_millis).abs() > self.window_millis {
            return true;
        }

        self.evict_aged(now_millis);

        if self
            .buckets
            .values()
            .any(|bucket| bucket.contains(nonce))
        {
            return true;
        }

        let bucket_key = timestamp_millis.div_euclid(BUCKET_MILLIS);
        if self.buckets.entry(bucket_key).or_default().insert(nonce.to_string()) {
            self.len += 1;
        }

        while self.len > self.max_entries {
            let Some((&oldest, _)) = self.buckets.iter().next() else {
                break;
            };
            if let Some(evicted) = self.buckets.remove(&oldest) {
                self.len -= evicted.len();
            }
        }

        false
    }

    /// Drops buckets wholly older than the replay window.
    fn evict_aged(&mut self, now_millis: i64) {
        let cutoff = (now_millis - self.window_millis).div_euclid(BUCKET_MILLIS);
        while let Some((&oldest, _)) = self.buckets.iter().next() {
            if oldest >= cutoff {
                break;
            }
            if let Some(evicted) = self.buckets.remove(&oldest) {
                self.len -= evicted.len();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}
