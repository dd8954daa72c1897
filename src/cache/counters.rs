//! Usage Counters Module
//!
//! Per-key-template hit/miss/set tallies. A key template is the canonical,
//! parameter-stripped form of a key (`user:42:profile` -> `user:{}:profile`)
//! produced by a [`KeyTemplater`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Resolves a raw key to its template; `None` means the key is not counted.
pub type KeyTemplater = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Placeholder substituted for parameter segments by [`default_template`].
pub const TEMPLATE_PLACEHOLDER: &str = "{}";

/// Default templater: replaces every all-digit `:`-separated segment with `{}`.
pub fn default_template(key: &str) -> Option<String> {
    if key.is_empty() {
        return None;
    }
    let segments: Vec<&str> = key
        .split(':')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                TEMPLATE_PLACEHOLDER
            } else {
                segment
            }
        })
        .collect();
    Some(segments.join(":"))
}

// == Usage Counter ==
/// Snapshot of one template's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    pub hit: u64,
    pub miss: u64,
    pub set: u64,
}

impl UsageCounter {
    /// Returns hit / (hit + miss), or 0.0 before any read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit + self.miss;
        if total == 0 {
            0.0
        } else {
            self.hit as f64 / total as f64
        }
    }
}

// == Usage Counters ==
/// Counter table owned by one backend instance.
pub struct UsageCounters {
    templater: KeyTemplater,
    table: HashMap<String, UsageCounter>,
}

impl UsageCounters {
    /// Creates an empty table using the given templater.
    pub fn new(templater: KeyTemplater) -> Self {
        Self {
            templater,
            table: HashMap::new(),
        }
    }

    /// Records the outcome of a read of `key`.
    pub fn record_get(&mut self, key: &str, hit: bool) {
        if let Some(counter) = self.counter_for(key) {
            if hit {
                counter.hit += 1;
            } else {
                counter.miss += 1;
            }
        }
    }

    /// Records a successful write of `key`.
    pub fn record_set(&mut self, key: &str) {
        if let Some(counter) = self.counter_for(key) {
            counter.set += 1;
        }
    }

    /// Returns the counters for `template`, zeroed if it was never seen.
    pub fn get(&self, template: &str) -> UsageCounter {
        self.table.get(template).copied().unwrap_or_default()
    }

    /// Number of templates seen so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn counter_for(&mut self, key: &str) -> Option<&mut UsageCounter> {
        let template = (self.templater)(key)?;
        Some(self.table.entry(template).or_default())
    }
}

impl Default for UsageCounters {
    fn default() -> Self {
        Self::new(Arc::new(default_template))
    }
}

impl fmt::Debug for UsageCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageCounters")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}
