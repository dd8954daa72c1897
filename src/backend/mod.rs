//! Memory Backend Module
//!
//! The async cache contract callers use. Each operation runs as one critical
//! section over the shared store, so read-modify-write operations such as
//! `incr` are atomic. Only the sweeper's sleep and the `is_locked` poll loop
//! suspend between store accesses.

mod lock;

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{
    default_template, CacheStats, CacheStore, KeyPattern, KeyTemplater, KeyTtl, SetMode,
    UsageCounter, UsageCounters,
};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_sweeper;

pub use lock::DEFAULT_LOCK_STEP;

/// Reply to a `ping` without a message.
pub const PONG: &[u8] = b"PONG";

// == Memory Backend ==
/// In-process cache backend with LRU eviction, TTL expiration, conditional
/// writes, and lock primitives.
///
/// # Example
/// ```no_run
/// use memory_cache::{CacheConfig, MemoryBackend, SetMode};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() {
///     let cache = MemoryBackend::new(CacheConfig::default().with_size(2));
///     cache.init().await;
///
///     cache.set("a", json!(1), None, SetMode::Always).await;
///     assert_eq!(cache.get("a").await, Some(json!(1)));
/// }
/// ```
pub struct MemoryBackend {
    /// Shared entry store, also held by the sweeper
    store: Arc<RwLock<CacheStore>>,
    /// Usage counters, present only when `count_stat` is on
    counters: Option<RwLock<UsageCounters>>,
    config: CacheConfig,
    /// Sweeper handle, set once by `init`
    sweeper: OnceLock<JoinHandle<()>>,
}

impl MemoryBackend {
    // == Constructors ==
    /// Creates a backend; counters, if enabled, use [`default_template`].
    pub fn new(config: CacheConfig) -> Self {
        Self::with_templater(config, Arc::new(default_template))
    }

    /// Creates a backend whose usage counters resolve keys with `templater`.
    pub fn with_templater(config: CacheConfig, templater: KeyTemplater) -> Self {
        let counters = config
            .count_stat
            .then(|| RwLock::new(UsageCounters::new(templater)));

        Self {
            store: Arc::new(RwLock::new(CacheStore::new(config.size))),
            counters,
            config,
            sweeper: OnceLock::new(),
        }
    }

    // == Lifecycle ==
    /// Starts the background sweeper. Later calls are no-ops.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn init(&self) {
        if !self.config.sweeper_enabled() || self.sweeper.get().is_some() {
            return;
        }

        let mut started = false;
        self.sweeper.get_or_init(|| {
            started = true;
            spawn_sweeper(Arc::clone(&self.store), self.config.check_interval)
        });

        if started {
            info!(
                size = self.config.size,
                count_stat = self.config.count_stat,
                check_interval_ms = self.config.check_interval.as_millis() as u64,
                "memory cache backend initialized"
            );
        }
    }

    /// Stops the background sweeper. The backend stays usable; expired
    /// entries are then only reclaimed when read.
    pub fn close(&self) {
        if let Some(handle) = self.sweeper.get() {
            if !handle.is_finished() {
                handle.abort();
                info!("expiration sweeper stopped");
            }
        }
    }

    /// Returns true while the background sweeper is running.
    pub fn sweeper_running(&self) -> bool {
        self.sweeper
            .get()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Removes every entry.
    pub async fn clear(&self) {
        self.store.write().await.clear();
        debug!("cache cleared");
    }

    // == Writes ==
    /// Stores `value` under `key` if `mode` allows it. Returns false when a
    /// conditional write is rejected.
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Value>,
        ttl: Option<Duration>,
        mode: SetMode,
    ) -> bool {
        let written = self.store.write().await.set(key, value.into(), ttl, mode);
        if written {
            self.record_set(key).await;
        }
        written
    }

    /// Stores every pair with the same TTL in one critical section.
    pub async fn set_many<I, K, V>(&self, pairs: I, ttl: Option<Duration>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut written = Vec::new();
        {
            let mut store = self.store.write().await;
            for (key, value) in pairs {
                let key = key.as_ref();
                if store.set(key, value.into(), ttl, SetMode::Always) {
                    written.push(key.to_string());
                }
            }
        }
        for key in &written {
            self.record_set(key).await;
        }
    }

    // == Reads ==
    /// Returns the live value under `key`.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let value = self.store.write().await.get(key);
        self.record_get(key, value.is_some()).await;
        value
    }

    /// Returns the live value under `key`, or `default`.
    pub async fn get_or(&self, key: &str, default: Value) -> Value {
        self.get(key).await.unwrap_or(default)
    }

    /// Reads several keys in one critical section, in argument order.
    pub async fn get_many<I, K>(&self, keys: I) -> Vec<Option<Value>>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        let values: Vec<Option<Value>> = {
            let mut store = self.store.write().await;
            keys.iter().map(|key| store.get(key.as_ref())).collect()
        };
        for (key, value) in keys.iter().zip(&values) {
            self.record_get(key.as_ref(), value.is_some()).await;
        }
        values
    }

    /// Returns true if a live entry exists under `key`.
    pub async fn exists(&self, key: &str) -> bool {
        self.store.read().await.exists(key)
    }

    // == Deletes ==
    /// Deletes `key`, returning whether it was stored.
    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    /// Deletes several keys, returning how many were stored.
    pub async fn delete_many<I, K>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut store = self.store.write().await;
        keys.into_iter()
            .filter(|key| store.delete(key.as_ref()))
            .count()
    }

    // == Patterns ==
    /// Live keys fully matching the glob `pattern`, least recently used
    /// first. The sequence is evaluated lazily over a snapshot taken now.
    pub async fn keys_match(&self, pattern: &str) -> Result<impl Iterator<Item = String>> {
        let pattern = KeyPattern::new(pattern)?;
        let snapshot = self.store.read().await.live_keys();
        Ok(snapshot.into_iter().filter(move |key| pattern.matches(key)))
    }

    /// Live key/value pairs whose keys match `pattern`.
    pub async fn get_match(&self, pattern: &str) -> Result<Vec<(String, Value)>> {
        let pattern = KeyPattern::new(pattern)?;
        let store = self.store.read().await;
        Ok(store
            .live_keys()
            .into_iter()
            .filter(|key| pattern.matches(key))
            .filter_map(|key| {
                let value = store.peek(&key)?.clone();
                Some((key, value))
            })
            .collect())
    }

    /// Deletes every key matching `pattern`, one critical section per key.
    /// Returns how many keys were actually removed.
    pub async fn delete_match(&self, pattern: &str) -> Result<usize> {
        let mut removed = 0;
        for key in self.keys_match(pattern).await? {
            if self.store.write().await.delete(&key) {
                removed += 1;
            }
        }
        debug!(pattern = %pattern, removed, "deleted matching keys");
        Ok(removed)
    }

    // == Expiration ==
    /// Sets a new TTL on a live key. Returns false if there is none.
    pub async fn expire(&self, key: &str, ttl: Duration) -> bool {
        self.store.write().await.expire(key, ttl)
    }

    /// Reports whether `key` is missing, persistent, or expiring.
    pub async fn get_expire(&self, key: &str) -> KeyTtl {
        self.store.read().await.get_expire(key)
    }

    // == Counters ==
    /// Increments the integer under `key` by one.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        self.incr_by(key, 1, None).await
    }

    /// Adds `delta` to the integer under `key`. `ttl` applies only when the
    /// counter is created by this call.
    pub async fn incr_by(&self, key: &str, delta: i64, ttl: Option<Duration>) -> Result<i64> {
        self.store.write().await.incr_by(key, delta, ttl)
    }

    // == Diagnostics ==
    /// Estimated bytes held by the entry under `key`; 0 if absent.
    pub async fn get_size(&self, key: &str) -> usize {
        self.store.read().await.entry_size(key)
    }

    /// Number of stored entries, including expired ones not yet reclaimed.
    pub async fn get_keys_count(&self) -> usize {
        self.store.read().await.len()
    }

    /// Store-wide statistics.
    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    /// Usage counters for one key template.
    ///
    /// # Errors
    /// Returns [`CacheError::CountersDisabled`] unless `count_stat` was set.
    pub async fn get_counters(&self, template: &str) -> Result<UsageCounter> {
        let counters = self.counters.as_ref().ok_or(CacheError::CountersDisabled)?;
        Ok(counters.read().await.get(template))
    }

    /// Echoes `message`, or replies `PONG`.
    pub async fn ping(&self, message: Option<&[u8]>) -> Vec<u8> {
        message.unwrap_or(PONG).to_vec()
    }

    async fn record_get(&self, key: &str, hit: bool) {
        if let Some(counters) = &self.counters {
            counters.write().await.record_get(key, hit);
        }
    }

    async fn record_set(&self, key: &str) {
        if let Some(counters) = &self.counters {
            counters.write().await.record_set(key);
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl Drop for MemoryBackend {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("config", &self.config)
            .field("sweeper_running", &self.sweeper_running())
            .finish_non_exhaustive()
    }
}
