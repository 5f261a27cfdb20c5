//! Expiring key→value cache in front of recall.
//!
//! A bounded LRU map where every value carries a deadline. Expired values
//! are removed lazily when read. Time comes from [`tokio::time::Instant`],
//! so tests can move the clock with `tokio::time::advance`.

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::config::CacheConfig;

/// Build a cache key of the form `prefix:part:part…`.
#[must_use]
pub fn cache_key(prefix: &str, parts: &[&str]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(':');
        key.push_str(part);
    }
    key
}

struct Slot<V> {
    value: V,
    expires: Instant,
}

/// Thread-safe TTL cache.
pub struct TtlCache<V> {
    inner: Mutex<LruCache<String, Slot<V>>>,
    ttl: Duration,
    enabled: bool,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache holding at most `capacity` keys for `ttl` each.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
            enabled: true,
        }
    }

    /// Create a cache from configuration. A disabled cache never stores.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        let mut cache = Self::new(config.capacity, config.ttl());
        cache.enabled = config.enabled;
        cache
    }

    /// Fresh value for `key`, if any. An expired value is dropped.
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            return None;
        }
        let mut inner = self.inner.lock();
        let expired = match inner.get(key) {
            None => return None,
            Some(slot) if Instant::now() <= slot.expires => return Some(slot.value.clone()),
            Some(_) => true,
        };
        if expired {
            inner.pop(key);
        }
        None
    }

    /// Store `value` under `key` with the default TTL.
    pub fn insert(&self, key: String, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    /// Store `value` under `key` for `ttl`.
    pub fn insert_with_ttl(&self, key: String, value: V, ttl: Duration) {
        if !self.enabled {
            return;
        }
        let expires = Instant::now() + ttl;
        self.inner.lock().put(key, Slot { value, expires });
    }

    /// Drop `key`. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Number of stored keys, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}
