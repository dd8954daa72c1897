//! Error types for the cache backend
//!
//! Provides unified error handling using thiserror. Cache misses and lock
//! contention are ordinary return values, not errors.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Usage counters were requested but `count_stat` is off
    #[error("Usage counters are disabled; construct the backend with count_stat enabled")]
    CountersDisabled,

    /// `incr` found a value that is not an integer
    #[error("Value at key is not an integer: {0}")]
    NotAnInteger(String),

    /// A key pattern could not be compiled into a matcher
    #[error("Invalid key pattern: {0}")]
    InvalidPattern(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache backend.
pub type Result<T> = std::result::Result<T, CacheError>;
