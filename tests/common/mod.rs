//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use aeromodel::connector::{Capabilities, Connector, FindAndModifyOptions, MemoryConnector, Operation};
use aeromodel::{FieldDef, FieldType, Instance, Model, ModelDefinition, ModelRegistry, ModelResult, QueryDescription};

/// Memory connector that counts calls per operation
#[derive(Default)]
pub struct CountingConnector {
    inner: MemoryConnector,
    calls: Mutex<HashMap<Operation, usize>>,
}

impl CountingConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self, op: Operation) -> usize {
        self.calls.lock().get(&op).copied().unwrap_or(0)
    }

    fn hit(&self, op: Operation) {
        *self.calls.lock().entry(op).or_default() += 1;
    }
}

impl Connector for CountingConnector {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn create(&self, model: &Model, instance: &Instance) -> ModelResult<Instance> {
        self.hit(Operation::Create);
        self.inner.create(model, instance)
    }

    fn find_by_id(&self, model: &Model, id: &Value) -> ModelResult<Option<Instance>> {
        self.hit(Operation::FindById);
        self.inner.find_by_id(model, id)
    }

    fn find_all(&self, model: &Model) -> ModelResult<Vec<Instance>> {
        self.hit(Operation::FindAll);
        self.inner.find_all(model)
    }

    fn query(&self, model: &Model, query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        self.hit(Operation::Query);
        self.inner.query(model, query)
    }

    fn update(&self, model: &Model, instance: &Instance) -> ModelResult<Instance> {
        self.hit(Operation::Update);
        self.inner.update(model, instance)
    }

    fn delete(&self, model: &Model, instance: &Instance) -> ModelResult<Instance> {
        self.hit(Operation::Delete);
        self.inner.delete(model, instance)
    }

    fn delete_all(&self, model: &Model) -> ModelResult<usize> {
        self.hit(Operation::DeleteAll);
        self.inner.delete_all(model)
    }

    fn distinct(&self, model: &Model, field: &str, query: &QueryDescription) -> ModelResult<Vec<Instance>> {
        self.hit(Operation::Distinct);
        self.inner.distinct(model, field, query)
    }

    fn count(&self, model: &Model, query: &QueryDescription) -> ModelResult<usize> {
        self.hit(Operation::Count);
        self.inner.count(model, query)
    }

    fn find_and_modify(
        &self,
        model: &Model,
        query: &QueryDescription,
        changes: &Map<String, Value>,
        options: FindAndModifyOptions,
    ) -> ModelResult<Option<Instance>> {
        self.hit(Operation::FindAndModify);
        self.inner.find_and_modify(model, query, changes, options)
    }

    fn upsert(&self, model: &Model, id: &Value, document: &Map<String, Value>) -> ModelResult<Instance> {
        self.hit(Operation::Upsert);
        self.inner.upsert(model, id, document)
    }
}

/// `user` with required `name` (string) and `age` (number), on the registry's memory connector
pub fn define_user(registry: &ModelRegistry) -> Model {
    registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String).required(true))
                .field("age", FieldDef::of(FieldType::Number).required(true))
                .connector_named("memory"),
        )
        .unwrap()
}

pub fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn names(records: &[Instance]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.get("name").and_then(|v| v.as_str().map(str::to_string)).unwrap_or_default())
        .collect()
}
