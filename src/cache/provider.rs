//! Cache provider contract
//!
//! Any keyed store honoring these four operations can stand in for the
//! built-in LRU. Values are record snapshots: a JSON object holding the
//! primary key under `id` and the field values under their declared names.

use serde_json::Value;

/// Keyed record store sitting in front of a connector's reads
pub trait CacheProvider: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn del(&self, key: &str);
    /// Drop every entry
    fn reset(&self);
}
