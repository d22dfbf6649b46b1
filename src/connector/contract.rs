//! The storage adapter contract
//!
//! Every method has a default body returning `Unsupported`; an adapter
//! overrides what it implements and advertises it through
//! [`Connector::capabilities`]. Models consult the capability set before
//! exposing a generated operation.

use serde_json::{Map, Value};

use super::operation::{Capabilities, Operation};
use crate::errors::{ModelError, ModelResult};
use crate::instance::Instance;
use crate::model::Model;
use crate::planner::QueryDescription;

/// Options for `find_and_modify`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindAndModifyOptions {
    /// Return the record after modification instead of before
    pub new: bool,
    /// Create the record when nothing matches
    pub upsert: bool,
}

impl FindAndModifyOptions {
    pub fn returning_new(mut self) -> Self {
        self.new = true;
        self
    }

    pub fn upsert(mut self) -> Self {
        self.upsert = true;
        self
    }

    /// Reads `{"new": bool, "upsert": bool}`; other keys are ignored
    pub fn from_json(value: &Value) -> Self {
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);
        Self {
            new: flag("new"),
            upsert: flag("upsert"),
        }
    }
}

/// Storage adapter
pub trait Connector: Send + Sync {
    /// Connector name, also the key for model metadata
    fn name(&self) -> &str;

    /// Implemented operations
    fn capabilities(&self) -> Capabilities;

    /// Called when the connector is first bound to a model
    fn init_model(&self, _model: &Model) {}

    /// Persist a new record and return it as stored, with its primary key
    fn create(&self, _model: &Model, _instance: &Instance) -> ModelResult<Instance> {
        Err(self.unsupported(Operation::Create))
    }

    fn find_by_id(&self, _model: &Model, _id: &Value) -> ModelResult<Option<Instance>> {
        Err(self.unsupported(Operation::FindById))
    }

    fn find_all(&self, _model: &Model) -> ModelResult<Vec<Instance>> {
        Err(self.unsupported(Operation::FindAll))
    }

    fn query(&self, _model: &Model, _query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        Err(self.unsupported(Operation::Query))
    }

    /// Persist the instance's current values under its primary key
    fn update(&self, _model: &Model, _instance: &Instance) -> ModelResult<Instance> {
        Err(self.unsupported(Operation::Update))
    }

    fn delete(&self, _model: &Model, _instance: &Instance) -> ModelResult<Instance> {
        Err(self.unsupported(Operation::Delete))
    }

    /// Remove every record of the model, returning how many were removed
    fn delete_all(&self, _model: &Model) -> ModelResult<usize> {
        Err(self.unsupported(Operation::DeleteAll))
    }

    fn distinct(&self, _model: &Model, _field: &str, _query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        Err(self.unsupported(Operation::Distinct))
    }

    fn count(&self, _model: &Model, _query: &QueryDescription) -> ModelResult<usize> {
        Err(self.unsupported(Operation::Count))
    }

    fn find_and_modify(
        &self,
        _model: &Model,
        _query: &QueryDescription,
        _changes: &Map<String, Value>,
        _options: FindAndModifyOptions,
    ) -> ModelResult<Option<Instance>> {
        Err(self.unsupported(Operation::FindAndModify))
    }

    /// Replace the record with `id`, creating it when absent
    fn upsert(&self, _model: &Model, _id: &Value, _document: &Map<String, Value>) -> ModelResult<Instance> {
        Err(self.unsupported(Operation::Upsert))
    }

    fn unsupported(&self, op: Operation) -> ModelError {
        ModelError::unsupported(self.name(), op)
    }
}
