// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Transient cache layer.
//!
//! Discovery results and per-field value lists are cached in a host-owned
//! key/value store with explicit expiry. Cache failures are never fatal: a
//! read error or an undecodable entry is a miss, a write error is logged and
//! the freshly computed value is still returned.
//!
//! ```text
//! read_through(key)
//!       │
//!       ├─→ get(key) → Some(json) → decode → return
//!       │
//!       └─→ miss / error / bad entry
//!                │
//!                └─→ compute() → set(key, ttl) → return
//! ```

mod ttl_cache;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics;

pub use ttl_cache::{TtlCache, TtlCacheStats};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry could not be encoded or decoded: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Host-owned key/value store with per-entry expiry.
pub trait TransientStore: Send + Sync {
    /// Live value for `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<(), CacheError>;

    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Read a typed value through the cache, computing and storing it on a miss.
///
/// `compute` returns `None` when the value must not be cached (e.g. the
/// underlying query failed); the fallback is returned without being stored.
pub fn read_through<T, F>(
    store: &dyn TransientStore,
    kind: &str,
    key: &str,
    ttl: Duration,
    compute: F,
) -> T
where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce() -> Option<T>,
{
    match store.get(key) {
        Ok(Some(value)) => match serde_json::from_value::<T>(value) {
            Ok(decoded) => {
                metrics::record_cache_lookup(kind, "hit");
                return decoded;
            }
            Err(e) => {
                metrics::record_cache_lookup(kind, "corrupt");
                warn!(key, error = %e, "Discarding undecodable cache entry");
            }
        },
        Ok(None) => metrics::record_cache_lookup(kind, "miss"),
        Err(e) => {
            metrics::record_cache_lookup(kind, "error");
            warn!(key, error = %e, "Cache read failed, recomputing");
        }
    }

    let Some(value) = compute() else {
        return T::default();
    };

    match serde_json::to_value(&value) {
        Ok(encoded) => {
            if let Err(e) = store.set(key, encoded, ttl) {
                warn!(key, error = %e, "Cache write failed");
            } else {
                debug!(key, ttl_secs = ttl.as_secs(), "Cached value");
            }
        }
        Err(e) => warn!(key, error = %e, "Cache value could not be encoded"),
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(60);

    struct BrokenStore;

    impl TransientStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Unavailable("object cache offline".into()))
        }
        fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("object cache offline".into()))
        }
        fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[test]
    fn test_read_through_caches_on_miss() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(vec!["color".to_string()])
        };

        let first: Vec<String> = read_through(&cache, "test", "k", TTL, compute);
        let second: Vec<String> = read_through(&cache, "test", "k", TTL, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Some(vec!["other".to_string()])
        });

        assert_eq!(first, vec!["color"]);
        assert_eq!(second, vec!["color"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_read_through_unavailable_cache_is_a_miss() {
        let value: Vec<String> =
            read_through(&BrokenStore, "test", "k", TTL, || Some(vec!["a".into()]));
        assert_eq!(value, vec!["a"]);
    }

    #[test]
    fn test_read_through_does_not_cache_failures() {
        let cache = TtlCache::new();
        let value: Vec<String> = read_through(&cache, "test", "k", TTL, || None);
        assert!(value.is_empty());
        assert!(cache.get("k").unwrap().is_none());
    }

    #[test]
    fn test_read_through_discards_corrupt_entry() {
        let cache = TtlCache::new();
        cache.set("k", serde_json::json!({"not": "a list"}), TTL).unwrap();
        let value: Vec<String> =
            read_through(&cache, "test", "k", TTL, || Some(vec!["fresh".into()]));
        assert_eq!(value, vec!["fresh"]);
        assert_eq!(cache.get("k").unwrap(), Some(serde_json::json!(["fresh"])));
    }
}
