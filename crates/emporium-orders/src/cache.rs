//! In-process TTL cache.
//!
//! Holds the shipping zone list between reads. Writers invalidate
//! explicitly; entries also lapse on their own after the TTL.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Key for the full shipping zone list.
pub const ZONES_CACHE_KEY: &str = "shipping_zones:all";

/// Keyed cache with per-entry expiry.
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn put(&self, key: &str, value: V, ttl: Duration);
    fn invalidate(&self, key: &str);
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// `RwLock<HashMap>` backed cache.
#[derive(Debug)]
pub struct MemoryCache<V> {
    store: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        MemoryCache {
            store: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Cache<V> for MemoryCache<V>
where
    V: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        {
            let store = self.store.read().unwrap_or_else(|p| p.into_inner());
            match store.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut store = self.store.write().unwrap_or_else(|p| p.into_inner());
        if store.get(key).is_some_and(|entry| entry.is_expired(now)) {
            store.remove(key);
        }
        None
    }

    fn put(&self, key: &str, value: V, ttl: Duration) {
        let mut store = self.store.write().unwrap_or_else(|p| p.into_inner());
        store.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    fn invalidate(&self, key: &str) {
        let mut store = self.store.write().unwrap_or_else(|p| p.into_inner());
        store.remove(key);
    }
}
