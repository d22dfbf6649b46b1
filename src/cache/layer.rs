//! Model-scoped cache policy
//!
//! Policy:
//! - `find_by_id` consults the provider by primary key first
//! - `find_all` fills per-record entries and remembers the table's keys;
//!   it is served from cache only while every remembered key is still cached
//! - create appends to the remembered keys; delete removes from them
//! - `delete_all` resets the whole provider
//! - operations that touch records by predicate drop the affected entry and the table keys
//!
//! Entries are snapshots of saved state. Every hit is rebuilt into a fresh
//! instance, so unsaved changes on a returned instance never leak into
//! later reads.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use super::config::CacheConfig;
use super::provider::CacheProvider;
use crate::instance::{Instance, PrimaryKeyAlias};
use crate::model::Model;
use crate::observability::Event;

/// Cache key for a primary key value
pub fn cache_key(pk: &Value) -> String {
    match pk {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Snapshot of an instance: primary key plus field values by declared name
fn snapshot(pk: Value, instance: &Instance) -> Value {
    let mut record = Map::new();
    record.insert(PrimaryKeyAlias::Id.as_str().to_string(), pk);
    record.extend(instance.values(false));
    Value::Object(record)
}

/// Cache state owned by one model
pub struct CacheLayer {
    provider: Option<Arc<dyn CacheProvider>>,
    /// Keys of the last full-table read, in connector order
    table: Mutex<Option<Vec<String>>>,
}

impl CacheLayer {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            provider: config.build(),
            table: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider(&self) -> Option<Arc<dyn CacheProvider>> {
        self.provider.clone()
    }

    fn rebuild(model: &Model, key: &str, record: Value) -> Option<Instance> {
        match model.instance(record, true) {
            Ok(instance) => Some(instance),
            Err(e) => {
                warn!(target: "aeromodel::cache", event = %Event::CacheMiss, model = %model.name(), id = %key, error = %e, "unreadable entry");
                None
            }
        }
    }

    pub fn get(&self, model: &Model, pk: &Value) -> Option<Instance> {
        let provider = self.provider.as_ref()?;
        let key = cache_key(pk);
        let hit = provider.get(&key);
        let event = if hit.is_some() { Event::CacheHit } else { Event::CacheMiss };
        trace!(target: "aeromodel::cache", event = %event, model = %model.name(), id = %pk);
        Self::rebuild(model, &key, hit?)
    }

    fn put(&self, instance: &Instance) -> Option<String> {
        let provider = self.provider.as_ref()?;
        let pk = instance.primary_key()?;
        let key = cache_key(&pk);
        provider.set(&key, snapshot(pk, instance));
        Some(key)
    }

    /// Record a fetched or updated instance
    pub fn store(&self, instance: &Instance) {
        self.put(instance);
    }

    /// Record a created instance and extend the remembered table
    pub fn created(&self, instance: &Instance) {
        if let Some(key) = self.put(instance) {
            if let Some(keys) = self.table.lock().as_mut() {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
    }

    /// Drop a deleted record
    pub fn deleted(&self, pk: &Value) {
        let Some(provider) = self.provider.as_ref() else {
            return;
        };
        let key = cache_key(pk);
        provider.del(&key);
        if let Some(keys) = self.table.lock().as_mut() {
            keys.retain(|k| k != &key);
        }
    }

    /// Drop one entry and forget the table; used when the record set may have changed shape
    pub fn invalidate(&self, pk: Option<&Value>) {
        let Some(provider) = self.provider.as_ref() else {
            return;
        };
        if let Some(pk) = pk {
            provider.del(&cache_key(pk));
        }
        *self.table.lock() = None;
    }

    /// Full table from cache, when every remembered entry is still present
    pub fn table(&self, model: &Model) -> Option<Vec<Instance>> {
        let provider = self.provider.as_ref()?;
        let keys = self.table.lock().clone()?;

        let mut records = Vec::with_capacity(keys.len());
        for key in &keys {
            let Some(record) = provider.get(key) else {
                debug!(target: "aeromodel::cache", event = %Event::CacheMiss, model = %model.name(), id = %key, "table entry missing");
                return None;
            };
            records.push(Self::rebuild(model, key, record)?);
        }
        trace!(target: "aeromodel::cache", event = %Event::CacheHit, model = %model.name(), count = records.len(), "table");
        Some(records)
    }

    /// Populate entries from a full-table read and remember its keys
    pub fn fill_table(&self, records: &[Instance]) {
        if self.provider.is_none() {
            return;
        }
        let keys: Vec<String> = records.iter().filter_map(|record| self.put(record)).collect();
        *self.table.lock() = Some(keys);
    }

    /// Drop everything
    pub fn reset(&self, model: &str) {
        if let Some(provider) = self.provider.as_ref() {
            provider.reset();
            *self.table.lock() = None;
            debug!(target: "aeromodel::cache", event = %Event::CacheReset, model);
        }
    }
}
