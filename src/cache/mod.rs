//! Cache Module
//!
//! Provides the in-memory entry store with TTL expiration and LRU eviction,
//! plus the helpers layered on it: key patterns, usage counters, and size
//! estimation.

mod counters;
mod entry;
mod lru;
mod pattern;
mod size;
mod stats;
mod store;


// Re-export public types
pub use counters::{default_template, KeyTemplater, UsageCounter, UsageCounters};
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use pattern::KeyPattern;
pub use size::value_size;
pub use stats::CacheStats;
pub use store::{CacheStore, KeyTtl, SetMode};
