//! Process-wide fetch cache.
//!
//! Maps an opaque cache key (usually `"<resource-kind>-<discriminator>"`) to
//! the most recently resolved value of a loader. There is no TTL: entries live
//! until they are overwritten, deleted, or the cache itself is dropped.
//!
//! Values are stored as JSON so one cache instance can serve bindings of any
//! result type. A stored `null` is a real entry and is distinct from a
//! missing key.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::Value;

// =============================================================================
// Cache Entry
// =============================================================================

/// A cached loader result.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: Value,
    pub written_at: DateTime<Utc>,
}

// =============================================================================
// Cache Statistics
// =============================================================================

/// Counters for cache activity.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl CacheStats {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of current stats.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub deletes: u64,
}

// =============================================================================
// Fetch Cache
// =============================================================================

/// Keyed store of the latest resolved loader values.
///
/// Share one instance per client through an `Arc`; tests create their own.
#[derive(Debug, Default)]
pub struct FetchCache {
    entries: DashMap<String, CacheEntry>,
    stats: CacheStats,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest value for `key`, or `None` when the key was never written or
    /// has been deleted.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.entries.get(key) {
            Some(entry) => {
                self.stats.record_hit();
                Some(entry.value.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Full entry including its write timestamp.
    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get(key).map(|e| e.clone())
    }

    /// Overwrite the entry for `key` (last write wins).
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.stats.record_write();
        tracing::trace!(key = %key, "fetch cache write");
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                value,
                written_at: Utc::now(),
            },
        );
    }

    /// Remove the entry for `key`. Returns true if one existed.
    pub fn delete(&self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_delete();
            tracing::trace!(key = %key, "fetch cache delete");
        }
        removed
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}
