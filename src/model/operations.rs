//! Generated model operations
//!
//! Every operation checks the bound connector first: no connector is
//! `MissingConnector`, a connector without the capability is `Unsupported`.
//! Cache maintenance happens before the operation returns.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use super::model::Model;
use crate::connector::{Connector, FindAndModifyOptions, Operation};
use crate::errors::{ModelError, ModelResult};
use crate::events::{HookPhase, InstanceEvent};
use crate::instance::{Collection, Instance};
use crate::observability::Event;
use crate::planner::QueryDescription;

fn to_json_or_null(instance: &Option<Instance>) -> Value {
    instance.as_ref().map(Instance::to_json).unwrap_or(Value::Null)
}

impl Model {
    /// Connector for `op`, or why the operation is unavailable
    fn bound(&self, op: Operation) -> ModelResult<Arc<dyn Connector>> {
        let connector = self.connector().ok_or(ModelError::MissingConnector)?;
        if !connector.capabilities().contains(op) {
            return Err(connector.unsupported(op));
        }
        Ok(connector)
    }

    /// Validate `data` and persist it
    pub fn create(&self, data: Value) -> ModelResult<Instance> {
        let connector = self.bound(Operation::Create)?;
        let instance = self.instance(data, false)?;
        self.persist_new(connector.as_ref(), &instance)
    }

    fn persist_new(&self, connector: &dyn Connector, instance: &Instance) -> ModelResult<Instance> {
        self.fire(HookPhase::Before, Operation::Create, || instance.to_json());
        let created = connector.create(self, instance)?;
        self.inner.cache.created(&created);
        let pk = created.primary_key().unwrap_or_default();
        debug!(
            target: "aeromodel::model",
            event = %Event::InstanceCreated,
            model = %self.name(),
            id = %pk
        );
        self.fire(HookPhase::After, Operation::Create, || created.to_json());
        Ok(created)
    }

    /// Create every element; failed elements leave a None in their slot
    pub fn create_many(&self, items: Vec<Value>) -> ModelResult<Vec<Option<Instance>>> {
        self.bound(Operation::Create)?;
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(position, item)| match self.create(item) {
                Ok(created) => Some(created),
                Err(e) => {
                    warn!(
                        target: "aeromodel::model",
                        event = %Event::BatchItemFailed,
                        model = %self.name(),
                        operation = %Operation::Create,
                        position,
                        error = %e
                    );
                    None
                }
            })
            .collect())
    }

    /// Lookup by primary key, served from cache when possible
    pub fn find_by_id(&self, id: &Value) -> ModelResult<Option<Instance>> {
        let connector = self.bound(Operation::FindById)?;
        self.fire(HookPhase::Before, Operation::FindById, || id.clone());

        let found = match self.inner.cache.get(self, id) {
            Some(hit) => Some(hit),
            None => {
                let found = connector.find_by_id(self, id)?;
                if let Some(instance) = &found {
                    self.inner.cache.store(instance);
                }
                found
            }
        };

        self.fire(HookPhase::After, Operation::FindById, || to_json_or_null(&found));
        Ok(found)
    }

    /// Lookup several keys; misses and failures leave a None in their slot
    pub fn find_by_ids(&self, ids: &[Value]) -> ModelResult<Vec<Option<Instance>>> {
        self.bound(Operation::FindById)?;
        Ok(ids
            .iter()
            .enumerate()
            .map(|(position, id)| {
                self.find_by_id(id).unwrap_or_else(|e| {
                    warn!(
                        target: "aeromodel::model",
                        event = %Event::BatchItemFailed,
                        model = %self.name(),
                        operation = %Operation::FindById,
                        position,
                        error = %e
                    );
                    None
                })
            })
            .collect())
    }

    /// Every record. Populates per-record cache entries; served from cache
    /// while every entry of the last full read is still cached.
    pub fn find_all(&self) -> ModelResult<Collection> {
        let connector = self.bound(Operation::FindAll)?;
        self.fire(HookPhase::Before, Operation::FindAll, || Value::Null);

        let records = match self.inner.cache.table(self) {
            Some(records) => records,
            None => {
                let records = connector.find_all(self)?;
                self.inner.cache.fill_table(&records);
                records
            }
        };
        let collection = Collection::from_trusted(self, records);

        self.fire(HookPhase::After, Operation::FindAll, || collection.to_json());
        Ok(collection)
    }

    /// Records matching a query description. Results are not cached.
    pub fn query(&self, query: &QueryDescription) -> ModelResult<Collection> {
        let connector = self.bound(Operation::Query)?;
        self.fire(HookPhase::Before, Operation::Query, || query.to_json());

        let records = connector.query(self, query)?;
        debug!(
            target: "aeromodel::model",
            event = %Event::QueryExecuted,
            model = %self.name(),
            count = records.len()
        );
        let collection = Collection::from_trusted(self, records);

        self.fire(HookPhase::After, Operation::Query, || collection.to_json());
        Ok(collection)
    }

    /// Parse a JSON query description and run it
    pub fn find(&self, query: &Value) -> ModelResult<Collection> {
        self.bound(Operation::Query)?;
        let query = QueryDescription::from_json(query)?;
        self.query(&query)
    }

    /// Persist an instance: created when it has no primary key, updated otherwise.
    /// A clean instance is returned as is.
    pub fn save(&self, instance: &Instance) -> ModelResult<Instance> {
        if instance.is_deleted() {
            return Err(ModelError::AlreadyDeleted);
        }
        if !instance.is_unsaved() {
            return Ok(instance.clone());
        }
        instance.validate_required()?;

        let updated = match instance.primary_key() {
            None => {
                let connector = self.bound(Operation::Create)?;
                let created = self.persist_new(connector.as_ref(), instance)?;
                if let Some(pk) = created.primary_key() {
                    instance.set_primary_key(pk);
                }
                false
            }
            Some(_) => {
                let connector = self.bound(Operation::Update)?;
                self.fire(HookPhase::Before, Operation::Update, || instance.to_json());
                connector.update(self, instance)?;
                self.inner.cache.store(instance);
                true
            }
        };

        instance.mark_saved();
        instance.emit(InstanceEvent::Save);
        let pk = instance.primary_key().unwrap_or_default();
        debug!(
            target: "aeromodel::model",
            event = %Event::InstanceSaved,
            model = %self.name(),
            id = %pk
        );
        if updated {
            self.fire(HookPhase::After, Operation::Update, || instance.to_json());
        }
        Ok(instance.clone())
    }

    /// Apply `changes` to the record with `id` and save it. None when no record matches.
    pub fn update_by_id(&self, id: &Value, changes: Map<String, Value>) -> ModelResult<Option<Instance>> {
        self.bound(Operation::Update)?;
        let Some(instance) = self.find_by_id(id)? else {
            return Ok(None);
        };
        instance.set_many(changes, false)?;
        self.save(&instance).map(Some)
    }

    pub fn delete(&self, instance: &Instance) -> ModelResult<Instance> {
        if instance.is_deleted() {
            return Err(ModelError::AlreadyDeleted);
        }
        let connector = self.bound(Operation::Delete)?;
        self.fire(HookPhase::Before, Operation::Delete, || instance.to_json());

        connector.delete(self, instance)?;
        instance.mark_deleted();
        if let Some(pk) = instance.primary_key() {
            self.inner.cache.deleted(&pk);
        }
        instance.emit(InstanceEvent::Delete);
        let pk = instance.primary_key().unwrap_or_default();
        debug!(
            target: "aeromodel::model",
            event = %Event::InstanceDeleted,
            model = %self.name(),
            id = %pk
        );

        self.fire(HookPhase::After, Operation::Delete, || instance.to_json());
        Ok(instance.clone())
    }

    /// Delete the record with `id`. None when no record matches.
    pub fn delete_by_id(&self, id: &Value) -> ModelResult<Option<Instance>> {
        self.bound(Operation::Delete)?;
        match self.find_by_id(id)? {
            Some(instance) => self.delete(&instance).map(Some),
            None => Ok(None),
        }
    }

    /// Delete several keys; misses and failures leave a None in their slot
    pub fn delete_many(&self, ids: &[Value]) -> ModelResult<Vec<Option<Instance>>> {
        self.bound(Operation::Delete)?;
        Ok(ids
            .iter()
            .enumerate()
            .map(|(position, id)| {
                self.delete_by_id(id).unwrap_or_else(|e| {
                    warn!(
                        target: "aeromodel::model",
                        event = %Event::BatchItemFailed,
                        model = %self.name(),
                        operation = %Operation::Delete,
                        position,
                        error = %e
                    );
                    None
                })
            })
            .collect())
    }

    /// Remove every record and reset the whole cache. Returns the number removed.
    pub fn delete_all(&self) -> ModelResult<usize> {
        let connector = self.bound(Operation::DeleteAll)?;
        self.fire(HookPhase::Before, Operation::DeleteAll, || Value::Null);

        let removed = connector.delete_all(self)?;
        self.inner.cache.reset(self.name());
        info!(
            target: "aeromodel::model",
            event = %Event::RecordsDeleted,
            model = %self.name(),
            removed
        );

        self.fire(HookPhase::After, Operation::DeleteAll, || json!(removed));
        Ok(removed)
    }

    /// One record per first-seen value of `field` (or comma-separated composite)
    pub fn distinct(&self, field: &str, query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        let connector = self.bound(Operation::Distinct)?;
        self.fire(HookPhase::Before, Operation::Distinct, || json!(field));
        let records = connector.distinct(self, field, query)?;
        self.fire(HookPhase::After, Operation::Distinct, || {
            Value::Array(records.iter().map(Instance::to_json).collect())
        });
        Ok(records)
    }

    /// Matching records, ignoring pagination
    pub fn count(&self, query: &QueryDescription) -> ModelResult<usize> {
        let connector = self.bound(Operation::Count)?;
        self.fire(HookPhase::Before, Operation::Count, || Value::Null);
        let count = connector.count(self, query)?;
        self.fire(HookPhase::After, Operation::Count, || json!(count));
        Ok(count)
    }

    /// Modify the first match. Returns the record before modification unless
    /// `options.new`; with `options.upsert`, a miss creates a record from `changes`.
    pub fn find_and_modify(
        &self,
        query: &QueryDescription,
        changes: Map<String, Value>,
        options: FindAndModifyOptions,
    ) -> ModelResult<Option<Instance>> {
        let connector = self.bound(Operation::FindAndModify)?;
        self.fire(HookPhase::Before, Operation::FindAndModify, || {
            Value::Object(changes.clone())
        });

        let result = connector.find_and_modify(self, query, &changes, options)?;
        if let Some(instance) = &result {
            self.inner.cache.invalidate(instance.primary_key().as_ref());
        }

        self.fire(HookPhase::After, Operation::FindAndModify, || to_json_or_null(&result));
        Ok(result)
    }

    /// Replace the record with `id`, creating it when absent
    pub fn upsert(&self, id: &Value, document: Map<String, Value>) -> ModelResult<Instance> {
        let connector = self.bound(Operation::Upsert)?;
        self.fire(HookPhase::Before, Operation::Upsert, || Value::Object(document.clone()));

        let stored = connector.upsert(self, id, &document)?;
        self.inner.cache.invalidate(Some(id));

        self.fire(HookPhase::After, Operation::Upsert, || stored.to_json());
        Ok(stored)
    }
}
