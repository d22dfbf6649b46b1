//! In-memory reference connector
//!
//! Records are kept per model name as `(primary key, storage payload)` in
//! insertion order. Primary keys are sequential integers starting at 1,
//! shared across the models bound to one connector; storing an explicit
//! numeric key moves the sequence past it. Every read returns
//! fresh instances, so a returned record never aliases stored state.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::debug;

use super::contract::{Connector, FindAndModifyOptions};
use super::operation::Capabilities;
use crate::cache::cache_key;
use crate::errors::{ModelError, ModelResult};
use crate::events::{ConnectorEvent, EventBus};
use crate::executor::QueryExecutor;
use crate::instance::{Instance, PrimaryKeyAlias};
use crate::model::Model;
use crate::planner::{split_fields, QueryDescription};

/// Default registered name
pub const MEMORY_CONNECTOR_NAME: &str = "memory";

#[derive(Debug, Clone)]
struct StoredRecord {
    id: Value,
    payload: Map<String, Value>,
}

/// Single-process connector backed by the query executor
pub struct MemoryConnector {
    name: String,
    capabilities: Capabilities,
    tables: RwLock<HashMap<String, Vec<StoredRecord>>>,
    next_id: AtomicU64,
    initialized: Mutex<HashSet<String>>,
    events: EventBus<ConnectorEvent>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("models", &self.tables.read().len())
            .finish()
    }
}

fn same_key(a: &Value, b: &Value) -> bool {
    cache_key(a) == cache_key(b)
}

/// Non-negative integer value of a key, whether given as a number or a string
fn numeric_key(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::all())
    }

    /// Connector implementing only `capabilities`
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            name: MEMORY_CONNECTOR_NAME.to_string(),
            capabilities,
            tables: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            initialized: Mutex::new(HashSet::new()),
            events: EventBus::new(),
        }
    }

    /// Rename, for registering several memory connectors side by side
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Restart primary-key assignment at 1
    pub fn reset_primary_keys(&self) {
        self.next_id.store(1, Ordering::SeqCst);
    }

    /// init-model notifications
    pub fn events(&self) -> &EventBus<ConnectorEvent> {
        &self.events
    }

    /// Stored record count for a model
    pub fn len(&self, model: &Model) -> usize {
        self.tables.read().get(model.name()).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, model: &Model) -> bool {
        self.len(model) == 0
    }

    fn next_primary_key(&self) -> Value {
        Value::from(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn materialize(model: &Model, record: StoredRecord) -> ModelResult<Instance> {
        let mut data = Map::with_capacity(record.payload.len() + 1);
        data.insert(PrimaryKeyAlias::Id.as_str().to_string(), record.id);
        for (key, value) in record.payload {
            data.insert(key, value);
        }
        model.instance(Value::Object(data), true)
    }

    fn snapshot(&self, model: &Model) -> Vec<StoredRecord> {
        self.tables
            .read()
            .get(model.name())
            .cloned()
            .unwrap_or_default()
    }

    fn all(&self, model: &Model) -> ModelResult<Vec<Instance>> {
        self.snapshot(model)
            .into_iter()
            .map(|r| Self::materialize(model, r))
            .collect()
    }

    fn find_record(&self, model: &Model, id: &Value) -> Option<StoredRecord> {
        self.tables
            .read()
            .get(model.name())
            .and_then(|rows| rows.iter().find(|r| same_key(&r.id, id)).cloned())
    }

    /// Insert a new record; fails when the key is taken
    fn insert(&self, model: &Model, id: Value, payload: Map<String, Value>) -> ModelResult<StoredRecord> {
        let mut tables = self.tables.write();
        let rows = tables.entry(model.name().to_string()).or_default();
        if rows.iter().any(|r| same_key(&r.id, &id)) {
            return Err(ModelError::Connector(format!(
                "record with primary key {} already exists",
                id
            )));
        }
        // keep sequential keys clear of explicit numeric ones
        if let Some(n) = numeric_key(&id) {
            self.next_id.fetch_max(n.saturating_add(1), Ordering::SeqCst);
        }
        let record = StoredRecord { id, payload };
        rows.push(record.clone());
        Ok(record)
    }

    /// Replace the payload of an existing record; None when absent
    fn replace(&self, model: &Model, id: &Value, payload: Map<String, Value>) -> Option<StoredRecord> {
        let mut tables = self.tables.write();
        let row = tables
            .get_mut(model.name())?
            .iter_mut()
            .find(|r| same_key(&r.id, id))?;
        row.payload = payload;
        Some(row.clone())
    }

    fn require_key(instance: &Instance) -> ModelResult<Value> {
        instance.primary_key().ok_or_else(|| {
            ModelError::Connector("record has no primary key".to_string())
        })
    }
}

impl Connector for MemoryConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn init_model(&self, model: &Model) {
        if self.initialized.lock().insert(model.name().to_string()) {
            self.events.publish(&ConnectorEvent::InitModel(model.clone()));
        }
    }

    fn create(&self, model: &Model, instance: &Instance) -> ModelResult<Instance> {
        let id = instance.primary_key().unwrap_or_else(|| self.next_primary_key());
        let record = self.insert(model, id, instance.to_payload())?;
        Self::materialize(model, record)
    }

    fn find_by_id(&self, model: &Model, id: &Value) -> ModelResult<Option<Instance>> {
        self.find_record(model, id)
            .map(|r| Self::materialize(model, r))
            .transpose()
    }

    fn find_all(&self, model: &Model) -> ModelResult<Vec<Instance>> {
        self.all(model)
    }

    fn query(&self, model: &Model, query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        let result = QueryExecutor::new(model).execute(self.all(model)?, query)?;
        debug!(
            target: "aeromodel::connector",
            connector = %self.name,
            model = %model.name(),
            scanned = result.scanned_count,
            matched = result.matched_count,
            returned = result.len()
        );
        Ok(result.records)
    }

    fn update(&self, model: &Model, instance: &Instance) -> ModelResult<Instance> {
        let id = Self::require_key(instance)?;
        let record = self
            .replace(model, &id, instance.to_payload())
            .ok_or_else(|| ModelError::Connector(format!("record with primary key {} not found", id)))?;
        Self::materialize(model, record)
    }

    fn delete(&self, model: &Model, instance: &Instance) -> ModelResult<Instance> {
        let id = Self::require_key(instance)?;
        let removed = {
            let mut tables = self.tables.write();
            let rows = tables.get_mut(model.name());
            match rows.and_then(|rows| {
                rows.iter()
                    .position(|r| same_key(&r.id, &id))
                    .map(|at| rows.remove(at))
            }) {
                Some(record) => record,
                None => {
                    return Err(ModelError::Connector(format!(
                        "record with primary key {} not found",
                        id
                    )))
                }
            }
        };
        Self::materialize(model, removed)
    }

    fn delete_all(&self, model: &Model) -> ModelResult<usize> {
        Ok(self
            .tables
            .write()
            .remove(model.name())
            .map_or(0, |rows| rows.len()))
    }

    fn distinct(&self, model: &Model, field: &str, query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        let mut query = query.clone();
        query.distinct = split_fields(field);
        self.query(model, &query)
    }

    fn count(&self, model: &Model, query: &QueryDescription) -> ModelResult<usize> {
        Ok(QueryExecutor::new(model).count(self.all(model)?, query))
    }

    fn find_and_modify(
        &self,
        model: &Model,
        query: &QueryDescription,
        changes: &Map<String, Value>,
        options: FindAndModifyOptions,
    ) -> ModelResult<Option<Instance>> {
        let Some(found) = QueryExecutor::new(model).first_match(self.all(model)?, query) else {
            if !options.upsert {
                return Ok(None);
            }
            let fresh = model.instance(Value::Object(changes.clone()), false)?;
            return self.create(model, &fresh).map(Some);
        };

        let id = Self::require_key(&found)?;
        let modified = Self::materialize(
            model,
            StoredRecord {
                id: id.clone(),
                payload: found.to_payload(),
            },
        )?;
        modified.set_many(changes.clone(), true)?;
        let record = self
            .replace(model, &id, modified.to_payload())
            .ok_or_else(|| ModelError::Connector(format!("record with primary key {} not found", id)))?;

        if options.new {
            Self::materialize(model, record).map(Some)
        } else {
            Ok(Some(found))
        }
    }

    fn upsert(&self, model: &Model, id: &Value, document: &Map<String, Value>) -> ModelResult<Instance> {
        let fresh = model.instance(Value::Object(document.clone()), false)?;
        let payload = fresh.to_payload();
        let record = match self.replace(model, id, payload.clone()) {
            Some(record) => record,
            None => self.insert(model, id.clone(), payload)?,
        };
        Self::materialize(model, record)
    }
}
