//! Lock primitive built from conditional writes.
//!
//! A lock is an ordinary entry holding the owner's token; its presence is the
//! lock state. `ABSENT -(set_lock)-> HELD -(unlock | TTL | eviction)-> ABSENT`.

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::MemoryBackend;
use crate::cache::SetMode;

/// Default interval between existence checks in [`MemoryBackend::is_locked`].
pub const DEFAULT_LOCK_STEP: Duration = Duration::from_millis(100);

impl MemoryBackend {
    /// Acquires the lock `key` for `ttl` if it is absent or expired.
    ///
    /// Returns false, leaving the current holder in place, if it is held.
    pub async fn set_lock(&self, key: &str, token: impl Into<Value>, ttl: Duration) -> bool {
        let acquired = self.set(key, token, Some(ttl), SetMode::IfAbsent).await;
        if acquired {
            debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "lock acquired");
        } else {
            debug!(key = %key, "lock contended");
        }
        acquired
    }

    /// Returns true if the lock `key` is held.
    ///
    /// With `wait`, polls every [`DEFAULT_LOCK_STEP`] until the lock is
    /// released (false) or the wait budget runs out (true).
    pub async fn is_locked(&self, key: &str, wait: Option<Duration>) -> bool {
        self.is_locked_with_step(key, wait, DEFAULT_LOCK_STEP).await
    }

    /// [`is_locked`](Self::is_locked) with an explicit poll interval. A zero
    /// step falls back to [`DEFAULT_LOCK_STEP`].
    pub async fn is_locked_with_step(
        &self,
        key: &str,
        wait: Option<Duration>,
        step: Duration,
    ) -> bool {
        let Some(mut budget) = wait else {
            return self.exists(key).await;
        };
        let step = if step.is_zero() { DEFAULT_LOCK_STEP } else { step };

        while !budget.is_zero() {
            if !self.exists(key).await {
                return false;
            }
            let pause = step.min(budget);
            tokio::time::sleep(pause).await;
            budget -= pause;
        }
        self.exists(key).await
    }

    /// Releases the lock `key` if it is held with `token`.
    ///
    /// Returns false, leaving the lock in place, when another token holds it
    /// or when it is not held at all.
    pub async fn unlock(&self, key: &str, token: impl Into<Value>) -> bool {
        let token = token.into();
        let released = self.store.write().await.delete_if_value(key, &token);
        if released {
            debug!(key = %key, "lock released");
        } else {
            debug!(key = %key, "unlock refused: lock not held by token");
        }
        released
    }
}
