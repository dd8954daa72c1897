//! Size Estimator Module
//!
//! Approximate deep size of stored values, for diagnostics only.

use std::collections::{HashSet, VecDeque};
use std::mem::size_of;

use serde_json::Value;

use crate::cache::CacheEntry;

/// Per-entry bookkeeping in a `serde_json::Map` beyond the key and value.
const MAP_NODE_OVERHEAD: usize = 2 * size_of::<usize>();

/// Estimates the bytes held by an entry, including its whole value graph.
pub fn entry_size(entry: &CacheEntry) -> usize {
    size_of::<CacheEntry>() - size_of::<Value>() + value_size(&entry.value)
}

/// Estimates the bytes held by `value` with a breadth-first walk.
///
/// Each node contributes its shallow size; nodes are visited once by address.
pub fn value_size(value: &Value) -> usize {
    let mut visited: HashSet<*const Value> = HashSet::new();
    let mut queue: VecDeque<&Value> = VecDeque::from([value]);
    let mut total = 0;

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node as *const Value) {
            continue;
        }
        total += shallow_size(node);

        match node {
            Value::Array(items) => queue.extend(items.iter()),
            Value::Object(map) => queue.extend(map.values()),
            _ => {}
        }
    }

    total
}

/// Size of one node without its children.
fn shallow_size(value: &Value) -> usize {
    let heap = match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        Value::String(s) => s.capacity(),
        // Children are counted as nodes; only spare capacity is added here
        Value::Array(items) => (items.capacity() - items.len()) * size_of::<Value>(),
        Value::Object(map) => map
            .keys()
            .map(|k| size_of::<String>() + k.capacity() + MAP_NODE_OVERHEAD)
            .sum(),
    };
    size_of::<Value>() + heap
}
