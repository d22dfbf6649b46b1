//! Bounded least-recently-used cache
//!
//! - Capacity bound: inserting past `max` evicts the least recently used entry
//! - Age bound: entries older than `max_age` are treated as absent
//! - Statistics are passive and never influence eviction

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde_json::Value;

use super::provider::CacheProvider;

/// Default capacity when caching is requested without options
pub const DEFAULT_MAX_ENTRIES: usize = 500;

/// Cache statistics for observability
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries dropped for capacity
    pub evictions: u64,
    /// Entries dropped for age
    pub expirations: u64,
}

struct Entry {
    value: Value,
    inserted: Instant,
    tick: u64,
}

#[derive(Default)]
struct LruState {
    entries: HashMap<String, Entry>,
    /// Recency order: tick -> key
    recency: BTreeMap<u64, String>,
    next_tick: u64,
    stats: CacheStats,
}

impl LruState {
    fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            self.recency.insert(tick, key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }
}

/// Size- and age-bounded LRU of record snapshots
pub struct LruCache {
    max: usize,
    max_age: Option<Duration>,
    state: Mutex<LruState>,
}

impl Default for LruCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES, None)
    }
}

impl LruCache {
    /// `max` of 0 is treated as 1
    pub fn new(max: usize, max_age: Option<Duration>) -> Self {
        Self {
            max: max.max(1),
            max_age,
            state: Mutex::new(LruState::default()),
        }
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats.clone()
    }

    fn expired(&self, entry: &Entry) -> bool {
        self.max_age
            .map(|age| entry.inserted.elapsed() > age)
            .unwrap_or(false)
    }
}

impl CacheProvider for LruCache {
    fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.state.lock();

        let expired = match state.entries.get(key) {
            None => {
                state.stats.misses += 1;
                return None;
            }
            Some(entry) => self.expired(entry),
        };

        if expired {
            state.remove(key);
            state.stats.expirations += 1;
            state.stats.misses += 1;
            return None;
        }

        state.touch(key);
        state.stats.hits += 1;
        state.entries.get(key).map(|entry| entry.value.clone())
    }

    fn set(&self, key: &str, value: Value) {
        let mut state = self.state.lock();
        state.remove(key);

        let tick = state.next_tick;
        state.next_tick += 1;
        state.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted: Instant::now(),
                tick,
            },
        );
        state.recency.insert(tick, key.to_string());

        while state.entries.len() > self.max {
            let oldest = match state.recency.iter().next() {
                Some((_, k)) => k.clone(),
                None => break,
            };
            state.remove(&oldest);
            state.stats.evictions += 1;
        }
    }

    fn del(&self, key: &str) {
        self.state.lock().remove(key);
    }

    fn reset(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.recency.clear();
    }
}
