//! Result types for query execution

use serde_json::Value;

use crate::instance::{Instance, PrimaryKeyAlias};

static NULL: Value = Value::Null;

/// A record under evaluation: the instance plus its flat JSON body
#[derive(Debug, Clone)]
pub struct ResultDocument {
    pub instance: Instance,
    /// Declared field values plus `id`
    pub body: Value,
}

impl ResultDocument {
    pub fn new(instance: Instance) -> Self {
        let mut body = instance.values(false);
        if let Some(pk) = instance.primary_key() {
            body.insert(PrimaryKeyAlias::Id.as_str().to_string(), pk);
        }
        Self {
            instance,
            body: Value::Object(body),
        }
    }

    pub fn id(&self) -> Option<&Value> {
        self.body.get(PrimaryKeyAlias::Id.as_str())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Value of `field`, Null when absent
    pub fn field(&self, field: &str) -> &Value {
        self.body.get(field).unwrap_or(&NULL)
    }
}

/// Result of query execution
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Records in result order
    pub records: Vec<Instance>,
    /// Number of records evaluated
    pub scanned_count: usize,
    /// Number of records that matched, before distinct and pagination
    pub matched_count: usize,
}

impl ExecutionResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.records.iter()
    }
}
