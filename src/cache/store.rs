//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU tracking and TTL
//! expiration. Every read and write passes through the lazy expiration check
//! and the capacity check here; nothing else touches the entries.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{entry::deadline_after, size, CacheEntry, CacheStats, LruTracker};
use crate::error::{CacheError, Result};

// == Set Mode ==
/// Condition a write must satisfy to be applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SetMode {
    /// Write unconditionally
    #[default]
    Always,
    /// Write only if the key is absent or expired
    IfAbsent,
    /// Write only if the key is present and live
    IfPresent,
}

// == Key TTL ==
/// Expiration state of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// No live entry under the key
    Missing,
    /// Live entry without expiration
    Persistent,
    /// Live entry expiring after the given duration
    Expires(Duration),
}

impl KeyTtl {
    /// Legacy encoding: remaining whole seconds (rounded), or `-1` for both
    /// missing and persistent keys.
    pub fn as_secs(&self) -> i64 {
        match self {
            KeyTtl::Missing | KeyTtl::Persistent => -1,
            KeyTtl::Expires(remaining) => remaining.as_secs_f64().round() as i64,
        }
    }
}

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_entries` entries.
    ///
    /// A capacity of zero is accepted: every write is evicted immediately.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
        }
    }

    // == Set ==
    /// Stores a value under `key` if `mode` allows it.
    ///
    /// Without a TTL, a live entry keeps its current expiration; an expired
    /// leftover is replaced by a fresh entry without expiration. If the store
    /// then exceeds capacity, the least recently used entry is evicted once.
    ///
    /// Returns false, without mutating anything, when `mode` rejects the write.
    pub fn set(&mut self, key: &str, value: Value, ttl: Option<Duration>, mode: SetMode) -> bool {
        let live = self.lookup(key, Instant::now()).is_some();
        match mode {
            SetMode::IfAbsent if live => return false,
            SetMode::IfPresent if !live => return false,
            _ => {}
        }

        let expires_at = match ttl {
            Some(ttl) => Some(deadline_after(ttl)),
            None => self.entries.get(key).and_then(|entry| entry.expires_at),
        };

        self.entries
            .insert(key.to_string(), CacheEntry::with_deadline(value, expires_at));
        self.lru.touch(key);

        if self.entries.len() > self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
                debug!(key = %evicted, "evicted least recently used entry");
            }
        }

        self.stats.set_total_entries(self.entries.len());
        true
    }

    // == Get ==
    /// Retrieves a live value by key and marks it most recently used.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        let value = self
            .lookup(key, Instant::now())
            .map(|entry| entry.value.clone());

        if value.is_some() {
            self.stats.record_hit();
            self.lru.touch(key);
        } else {
            self.stats.record_miss();
        }
        value
    }

    // == Exists ==
    /// Returns true if a live entry exists. Does not affect recency.
    pub fn exists(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Delete ==
    /// Removes an entry by key, returning whether one was stored.
    ///
    /// No expiration check is made: an expired entry that has not been
    /// reclaimed yet is still deleted and reported as existing.
    pub fn delete(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }

    /// Deletes `key` only if it holds a live entry equal to `expected`.
    pub fn delete_if_value(&mut self, key: &str, expected: &Value) -> bool {
        let matches = self
            .lookup(key, Instant::now())
            .is_some_and(|entry| entry.value == *expected);
        matches && self.delete(key)
    }

    // == Expiration ==
    /// Replaces the expiration of a live entry. Value and recency are untouched.
    pub fn expire(&mut self, key: &str, ttl: Duration) -> bool {
        match self.lookup(key, Instant::now()) {
            Some(entry) => {
                entry.expires_at = Some(deadline_after(ttl));
                true
            }
            None => false,
        }
    }

    /// Reports the expiration state of `key`.
    pub fn get_expire(&self, key: &str) -> KeyTtl {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => KeyTtl::Missing,
            Some(entry) => entry
                .ttl_remaining()
                .map_or(KeyTtl::Persistent, KeyTtl::Expires),
            None => KeyTtl::Missing,
        }
    }

    // == Increment ==
    /// Adds `delta` to the integer under `key`, treating a missing key as 0.
    ///
    /// `ttl` applies only when this call creates the counter; an existing
    /// counter keeps its expiration.
    pub fn incr_by(&mut self, key: &str, delta: i64, ttl: Option<Duration>) -> Result<i64> {
        let current = match self.lookup(key, Instant::now()) {
            Some(entry) => Some(
                entry
                    .value
                    .as_i64()
                    .ok_or_else(|| CacheError::NotAnInteger(key.to_string()))?,
            ),
            None => None,
        };

        let updated = current.unwrap_or(0).saturating_add(delta);
        let ttl = if current.is_none() { ttl } else { None };
        self.set(key, Value::from(updated), ttl, SetMode::Always);
        Ok(updated)
    }

    // == Reclaim ==
    /// Removes `key` if its entry has expired. Recency and hit/miss
    /// statistics are left alone.
    pub fn reclaim_if_expired(&mut self, key: &str) -> bool {
        let expired = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired());
        if expired {
            self.remove_expired(key);
        }
        expired
    }

    // == Keys ==
    /// Snapshot of every stored key, least recently used first.
    pub fn keys(&self) -> Vec<String> {
        self.lru.iter().cloned().collect()
    }

    /// Snapshot of live keys, least recently used first.
    pub fn live_keys(&self) -> Vec<String> {
        let now = Instant::now();
        self.lru
            .iter()
            .filter(|key| {
                self.entries
                    .get(key.as_str())
                    .is_some_and(|entry| !entry.is_expired_at(now))
            })
            .cloned()
            .collect()
    }

    /// Live value for `key` without touching recency or statistics.
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    // == Size ==
    /// Estimated size in bytes of a live entry, or 0 if there is none.
    pub fn entry_size(&self, key: &str) -> usize {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map_or(0, size::entry_size)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Clear ==
    /// Removes every entry. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Length ==
    /// Returns the number of stored entries, expired leftovers included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Live entry for `key`; an expired entry is removed on the way.
    fn lookup(&mut self, key: &str, now: Instant) -> Option<&mut CacheEntry> {
        if self.entries.get(key)?.is_expired_at(now) {
            self.remove_expired(key);
            return None;
        }
        self.entries.get_mut(key)
    }

    fn remove_expired(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
        self.stats.record_expiration();
        self.stats.set_total_entries(self.entries.len());
        debug!(key = %key, "removed expired entry");
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::time::advance;

    fn set(store: &mut CacheStore, key: &str, value: Value) -> bool {
        store.set(key, value, None, SetMode::Always)
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.capacity(), 100);
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = CacheStore::new(100);

        assert!(set(&mut store, "key1", json!("value1")));

        assert_eq!(store.get("key1"), Some(json!("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = CacheStore::new(100);
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_store_delete() {
        let mut store = CacheStore::new(100);

        set(&mut store, "key1", json!(1));
        assert!(store.delete("key1"));

        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_delete_nonexistent() {
        let mut store = CacheStore::new(100);
        assert!(!store.delete("nonexistent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_delete_unreclaimed_expired_entry() {
        let mut store = CacheStore::new(100);

        store.set("k", json!(1), Some(Duration::from_secs(1)), SetMode::Always);
        advance(Duration::from_secs(2)).await;

        // still stored until observed, so the delete reports it
        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100);

        set(&mut store, "key1", json!("value1"));
        set(&mut store, "key1", json!("value2"));

        assert_eq!(store.get("key1"), Some(json!("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_set_if_absent() {
        let mut store = CacheStore::new(100);

        assert!(store.set("k", json!(1), None, SetMode::IfAbsent));
        assert!(!store.set("k", json!(2), None, SetMode::IfAbsent));
        assert_eq!(store.get("k"), Some(json!(1)));
    }

    #[test]
    fn test_store_set_if_present() {
        let mut store = CacheStore::new(100);

        assert!(!store.set("k", json!(1), None, SetMode::IfPresent));
        assert!(!store.exists("k"));

        set(&mut store, "k", json!(1));
        assert!(store.set("k", json!(2), None, SetMode::IfPresent));
        assert_eq!(store.get("k"), Some(json!(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_set_if_absent_over_expired_entry() {
        let mut store = CacheStore::new(100);

        store.set("lock", json!("a"), Some(Duration::from_secs(1)), SetMode::Always);
        advance(Duration::from_secs(2)).await;

        assert!(store.set("lock", json!("b"), None, SetMode::IfAbsent));
        assert_eq!(store.get("lock"), Some(json!("b")));
        assert_eq!(store.get_expire("lock"), KeyTtl::Persistent);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_expiration() {
        let mut store = CacheStore::new(100);

        store.set("key1", json!(1), Some(Duration::from_secs(1)), SetMode::Always);
        assert_eq!(store.get("key1"), Some(json!(1)));

        advance(Duration::from_millis(1100)).await;

        assert!(!store.exists("key1"));
        assert_eq!(store.len(), 1, "Expired entry stays until observed");
        assert_eq!(store.get("key1"), None);
        assert_eq!(store.len(), 0, "Get reclaims the expired entry");
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_zero_ttl_expires_immediately() {
        let mut store = CacheStore::new(100);

        assert!(store.set("k", json!(1), Some(Duration::ZERO), SetMode::Always));
        assert_eq!(store.get("k"), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_set_without_ttl_preserves_expiry() {
        let mut store = CacheStore::new(100);

        store.set("k", json!(1), Some(Duration::from_secs(10)), SetMode::Always);
        advance(Duration::from_secs(4)).await;
        set(&mut store, "k", json!(2));

        assert_eq!(
            store.get_expire("k"),
            KeyTtl::Expires(Duration::from_secs(6))
        );
        assert_eq!(store.get("k"), Some(json!(2)));

        advance(Duration::from_secs(7)).await;
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = CacheStore::new(3);

        set(&mut store, "key1", json!(1));
        set(&mut store, "key2", json!(2));
        set(&mut store, "key3", json!(3));
        set(&mut store, "key4", json!(4));

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert!(store.get("key2").is_some());
        assert!(store.get("key3").is_some());
        assert!(store.get("key4").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = CacheStore::new(3);

        set(&mut store, "key1", json!(1));
        set(&mut store, "key2", json!(2));
        set(&mut store, "key3", json!(3));

        store.get("key1");
        set(&mut store, "key4", json!(4));

        assert!(store.get("key1").is_some());
        assert_eq!(store.get("key2"), None);
    }

    #[test]
    fn test_store_lru_touch_on_overwrite() {
        let mut store = CacheStore::new(2);

        set(&mut store, "a", json!(1));
        set(&mut store, "b", json!(2));
        set(&mut store, "a", json!(3));
        set(&mut store, "c", json!(4));

        assert_eq!(store.keys(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_store_zero_capacity() {
        let mut store = CacheStore::new(0);

        assert!(set(&mut store, "a", json!(1)));
        assert!(store.is_empty());
        assert_eq!(store.get("a"), None);
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_exists_does_not_touch() {
        let mut store = CacheStore::new(2);

        set(&mut store, "a", json!(1));
        set(&mut store, "b", json!(2));
        assert!(store.exists("a"));
        set(&mut store, "c", json!(3));

        assert!(!store.exists("a"));
    }

    #[test]
    fn test_store_delete_if_value() {
        let mut store = CacheStore::new(10);

        set(&mut store, "lock", json!("owner"));
        assert!(!store.delete_if_value("lock", &json!("intruder")));
        assert!(store.exists("lock"));
        assert!(store.delete_if_value("lock", &json!("owner")));
        assert!(!store.exists("lock"));
        assert!(!store.delete_if_value("lock", &json!("owner")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_expire_and_get_expire() {
        let mut store = CacheStore::new(10);

        assert_eq!(store.get_expire("missing"), KeyTtl::Missing);
        assert!(!store.expire("missing", Duration::from_secs(5)));

        set(&mut store, "k", json!(1));
        assert_eq!(store.get_expire("k"), KeyTtl::Persistent);
        assert_eq!(store.get_expire("k").as_secs(), -1);

        assert!(store.expire("k", Duration::from_secs(5)));
        assert_eq!(store.get_expire("k"), KeyTtl::Expires(Duration::from_secs(5)));
        assert_eq!(store.get_expire("k").as_secs(), 5);
        assert_eq!(store.get("k"), Some(json!(1)));

        advance(Duration::from_secs(6)).await;
        assert_eq!(store.get_expire("k"), KeyTtl::Missing);
        assert!(!store.expire("k", Duration::from_secs(5)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_store_incr() {
        let mut store = CacheStore::new(10);

        assert_eq!(store.incr_by("n", 1, None), Ok(1));
        assert_eq!(store.incr_by("n", 1, None), Ok(2));
        assert_eq!(store.incr_by("n", -5, None), Ok(-3));
        assert_eq!(store.get("n"), Some(json!(-3)));
    }

    #[test]
    fn test_store_incr_not_an_integer() {
        let mut store = CacheStore::new(10);

        set(&mut store, "s", json!("text"));
        assert_eq!(
            store.incr_by("s", 1, None),
            Err(CacheError::NotAnInteger("s".to_string()))
        );
        assert_eq!(store.get("s"), Some(json!("text")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_incr_ttl_only_on_create() {
        let mut store = CacheStore::new(10);

        store.incr_by("n", 1, Some(Duration::from_secs(10))).unwrap();
        advance(Duration::from_secs(3)).await;
        store.incr_by("n", 1, Some(Duration::from_secs(100))).unwrap();

        assert_eq!(store.get_expire("n"), KeyTtl::Expires(Duration::from_secs(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_reclaim_if_expired() {
        let mut store = CacheStore::new(10);

        store.set("short", json!(1), Some(Duration::from_secs(1)), SetMode::Always);
        set(&mut store, "forever", json!(2));
        advance(Duration::from_secs(2)).await;

        assert!(store.reclaim_if_expired("short"));
        assert!(!store.reclaim_if_expired("forever"));
        assert!(!store.reclaim_if_expired("missing"));
        assert_eq!(store.keys(), vec!["forever".to_string()]);

        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.expirations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_live_keys_skip_expired() {
        let mut store = CacheStore::new(10);

        set(&mut store, "a", json!(1));
        store.set("b", json!(2), Some(Duration::from_secs(1)), SetMode::Always);
        set(&mut store, "c", json!(3));
        advance(Duration::from_secs(2)).await;

        assert_eq!(store.keys().len(), 3);
        assert_eq!(store.live_keys(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(store.peek("b"), None);
        assert_eq!(store.peek("a"), Some(&json!(1)));
    }

    #[test]
    fn test_store_entry_size() {
        let mut store = CacheStore::new(10);

        assert_eq!(store.entry_size("missing"), 0);
        set(&mut store, "small", json!(1));
        set(&mut store, "big", json!({"items": [1, 2, 3, 4], "name": "large"}));

        assert!(store.entry_size("small") > 0);
        assert!(store.entry_size("big") > store.entry_size("small"));
    }

    #[test]
    fn test_store_stats() {
        let mut store = CacheStore::new(100);

        set(&mut store, "key1", json!(1));
        store.get("key1");
        store.get("nonexistent");

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_store_clear() {
        let mut store = CacheStore::new(100);

        set(&mut store, "a", json!(1));
        set(&mut store, "b", json!(2));
        store.clear();

        assert!(store.is_empty());
        assert!(store.keys().is_empty());
        assert!(set(&mut store, "a", json!(3)));
        assert_eq!(store.len(), 1);
    }
}
