// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process TTL cache.
//!
//! A `DashMap`-backed [`TransientStore`] for hosts without a persistent
//! object cache, and for tests. Expired entries are dropped lazily on read.
//! Concurrent writers to the same key are last-write-wins; entries are pure
//! functions of stable data so no further coordination is needed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use super::{CacheError, TransientStore};

#[derive(Clone, Debug)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// TTL cache keyed by string
pub struct TtlCache {
    entries: DashMap<String, CacheEntry>,
    hits: AtomicU64,
    misses: AtomicU64,
    /// Entries found but already expired
    expired: AtomicU64,
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct TtlCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub expired: u64,
    /// Entries currently stored (including not-yet-collected expired ones)
    pub entry_count: usize,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expired: AtomicU64::new(0),
        }
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        if let Some(entry) = self.entries.get(key) {
            if now < entry.expires_at {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            self.expired.fetch_add(1, Ordering::Relaxed);
            drop(entry); // Release read lock before removing
            // A fresh value may have been written since the read
            self.entries.remove_if(key, |_, entry| now >= entry.expires_at);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn stats(&self) -> TtlCacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        TtlCacheStats {
            hits,
            misses,
            expired: self.expired.load(Ordering::Relaxed),
            entry_count: self.entries.len(),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Remove every entry whose expiry has passed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut purged = 0;
        self.entries.retain(|_, entry| {
            let live = now < entry.expires_at;
            if !live {
                purged += 1;
            }
            live
        });
        purged
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TransientStore for TtlCache {
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.get_at(key, Instant::now()))
    }

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cache_hit() {
        let cache = TtlCache::new();
        cache.set("keys", json!(["color", "size"]), Duration::from_secs(60)).unwrap();

        assert_eq!(cache.get("keys").unwrap(), Some(json!(["color", "size"])));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_cache_miss() {
        let cache = TtlCache::new();
        assert_eq!(cache.get("keys").unwrap(), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_entry_expires() {
        let cache = TtlCache::new();
        cache.set("keys", json!(["color"]), Duration::from_secs(60)).unwrap();

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(cache.get_at("keys", later), None);

        let stats = cache.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.entry_count, 0);
    }

    #[test]
    fn test_zero_ttl_is_immediately_stale() {
        let cache = TtlCache::new();
        cache.set("keys", json!([]), Duration::ZERO).unwrap();
        assert_eq!(cache.get("keys").unwrap(), None);
    }

    #[test]
    fn test_delete() {
        let cache = TtlCache::new();
        cache.set("keys", json!(["a"]), Duration::from_secs(60)).unwrap();
        cache.delete("keys").unwrap();
        assert_eq!(cache.get("keys").unwrap(), None);

        // Deleting a missing key is not an error
        assert!(cache.delete("missing").is_ok());
    }

    #[test]
    fn test_overwrite_refreshes_value() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_secs(60)).unwrap();
        cache.set("k", json!(2), Duration::from_secs(60)).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some(json!(2)));
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[test]
    fn test_purge_expired() {
        let cache = TtlCache::new();
        cache.set("old", json!(1), Duration::ZERO).unwrap();
        cache.set("fresh", json!(2), Duration::from_secs(60)).unwrap();
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[test]
    fn test_expired_read_only_removes_expired_entry() {
        let cache = TtlCache::new();
        cache.set("keys", json!(["old"]), Duration::from_secs(60)).unwrap();
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(cache.get_at("keys", later), None);

        cache.set("keys", json!(["new"]), Duration::from_secs(3600)).unwrap();
        assert_eq!(cache.get_at("keys", later), Some(json!(["new"])));
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[test]
    fn test_concurrent_expiry_keeps_fresh_writes() {
        let cache = std::sync::Arc::new(TtlCache::new());
        let later = Instant::now() + Duration::from_secs(61);

        let reader = {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for _ in 0..2_000 {
                    let _ = cache.get_at("keys", later);
                }
            })
        };
        for i in 0..2_000 {
            cache.set("keys", json!(i), Duration::from_secs(3600)).unwrap();
            // A live write is never taken for expired
            assert!(cache.get_at("keys", later).is_some());
        }
        reader.join().unwrap();
    }

    #[test]
    fn test_purge_counts_only_removed_entries() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::from_secs(10)).unwrap();
        cache.set("b", json!(2), Duration::from_secs(3600)).unwrap();
        let later = Instant::now() + Duration::from_secs(11);
        assert_eq!(cache.purge_expired_at(later), 1);
        assert_eq!(cache.purge_expired_at(later), 0);
        assert_eq!(cache.stats().entry_count, 1);
    }

    #[test]
    fn test_hit_rate() {
        let cache = TtlCache::new();
        cache.set("k", json!(1), Duration::from_secs(60)).unwrap();

        // 3 hits, 1 miss
        cache.get("k").unwrap();
        cache.get("k").unwrap();
        cache.get("k").unwrap();
        cache.get("x").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.75).abs() < 0.01);
    }
}
