//! Expiration Sweeper Task
//!
//! Background task that periodically reclaims expired entries nobody reads
//! again. It owns no expiration logic: each key of a snapshot is handed to
//! the store's own expiration check.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::cache::CacheStore;

/// Spawns a background task that sweeps the store every `check_interval`.
///
/// The task runs until aborted through the returned handle.
///
/// # Example
/// ```ignore
/// let store = Arc::new(RwLock::new(CacheStore::new(1000)));
/// let sweeper = spawn_sweeper(store.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper(store: Arc<RwLock<CacheStore>>, check_interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_ms = check_interval.as_millis() as u64,
            "starting expiration sweeper"
        );

        loop {
            tokio::time::sleep(check_interval).await;

            let removed = sweep(&store).await;
            if removed > 0 {
                debug!(removed, "sweep reclaimed expired entries");
            } else {
                trace!("sweep found no expired entries");
            }
        }
    })
}

/// Runs one sweep over a snapshot of the current keys.
///
/// The write lock is taken per key, so callers interleave with a long sweep.
/// A key removed between the snapshot and its check is simply skipped.
/// Returns the number of entries reclaimed.
pub async fn sweep(store: &RwLock<CacheStore>) -> usize {
    let snapshot = store.read().await.keys();

    let mut removed = 0;
    for key in snapshot {
        if store.write().await.reclaim_if_expired(&key) {
            trace!(key = %key, "swept expired entry");
            removed += 1;
        }
    }
    removed
}
