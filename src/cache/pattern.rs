//! Key Pattern Module
//!
//! Glob-style key patterns where `*` matches any run of characters and every
//! other character matches literally.

use regex::Regex;

use crate::error::{CacheError, Result};

/// Compiled key pattern.
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Compiles `pattern` into an anchored matcher.
    pub fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");

        // (?s) lets `*` span newlines inside keys
        let regex = Regex::new(&format!("^(?s:{body})$"))
            .map_err(|_| CacheError::InvalidPattern(pattern.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the whole key matches.
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    /// The pattern as written by the caller.
    #[allow(dead_code)]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
