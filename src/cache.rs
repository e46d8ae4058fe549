//! # TTL Cache
//! Small in-memory key → value store with a per-entry expiry.
//!
//! Expiry is checked lazily: an expired entry is evicted the first time it is
//! read after its deadline. Used for rendered feed documents and scraped
//! articles; both are shared between the refresh loop and request handlers.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

use tokio::time::Instant;

/// Upper bound applied when `now + ttl` would overflow the clock.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Cache key helpers, so every caller spells keys the same way.
pub struct CacheKeys;

impl CacheKeys {
    pub const FEED_PREFIX: &'static str = "feed_xml";

    /// Rendered RSS document for one output category.
    pub fn feed(category: &str) -> String {
        format!("{}::{}", Self::FEED_PREFIX, category)
    }

    /// Scraped article body, keyed by the item guid.
    pub fn article(guid: &str) -> String {
        format!("article::{guid}")
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe TTL cache. Values are cloned out on read.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poison) => poison.into_inner(),
        }
    }

    /// Return a live value, evicting it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut map = self.lock();
        match map.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                map.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or overwrite `key` with a fresh TTL.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let now = Instant::now();
        let expires_at = now.checked_add(ttl).unwrap_or(now + MAX_TTL);
        self.lock().insert(key, CacheEntry { value, expires_at });
    }

    /// True if any live entry satisfies `pred` on its key.
    pub fn any_live_key<F>(&self, pred: F) -> bool
    where
        F: Fn(&K) -> bool,
    {
        let now = Instant::now();
        self.lock()
            .iter()
            .any(|(k, e)| e.expires_at > now && pred(k))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, e| e.expires_at > now);
        before - map.len()
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
