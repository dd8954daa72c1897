//! Memory Cache - An in-process cache backend
//!
//! Provides bounded LRU storage with per-key TTL expiration, conditional
//! writes, a lock primitive, glob key matching, and per-key-template usage
//! counters. A background sweeper reclaims expired entries nobody reads.

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use backend::{MemoryBackend, DEFAULT_LOCK_STEP, PONG};
pub use cache::{CacheStats, KeyTemplater, KeyTtl, SetMode, UsageCounter};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
