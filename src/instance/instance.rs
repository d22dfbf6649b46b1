//! Live record bound to a model
//!
//! State machine:
//!
//! ```text
//! new --set--> unsaved --save--> saved --delete--> deleted
//!                 ^                |
//!                 +------set-------+
//! ```
//!
//! - Writes are staged, validated as a group, and committed atomically
//! - A rejected write leaves values and the changed-field list untouched
//! - `change:<field>` is published after the write lock is released
//! - Values handed out are copies; mutating them never marks the instance dirty

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::primary_key::PrimaryKeyAlias;
use crate::errors::{ModelError, ModelResult};
use crate::events::{EventBus, InstanceEvent};
use crate::model::Model;
use crate::schema::FieldSpec;

/// Coarse lifecycle position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceStatus {
    /// Never persisted
    New,
    /// Persisted, with changes not yet saved
    Unsaved,
    /// Persisted and clean
    Saved,
    /// Terminal
    Deleted,
}

#[derive(Debug, Default)]
struct InstanceState {
    values: Map<String, Value>,
    /// Changed field names, in first-change order
    changed: Vec<String>,
    primary_key: Option<Value>,
    deleted: bool,
    unsaved: bool,
}

struct InstanceInner {
    model: Model,
    state: RwLock<InstanceState>,
    events: EventBus<InstanceEvent>,
}

/// Shared handle to one record. Clones observe the same state.
#[derive(Clone)]
pub struct Instance {
    inner: Arc<InstanceInner>,
}

/// A value staged for commit, with its field's declaration index
struct Staged {
    index: usize,
    field: String,
    value: Value,
}

impl Instance {
    fn blank(model: &Model) -> Instance {
        Instance {
            inner: Arc::new(InstanceInner {
                model: model.clone(),
                state: RwLock::new(InstanceState::default()),
                events: EventBus::new(),
            }),
        }
    }

    /// Build an instance from caller data: aliases resolved, defaults applied,
    /// every value coerced and validated, required fields checked.
    pub(crate) fn create(model: &Model, data: Value) -> ModelResult<Instance> {
        let data = expect_object(data)?;
        let instance = Instance::blank(model);

        let mut changes: Vec<(String, Value)> = Vec::with_capacity(data.len());
        for (key, value) in data {
            if PrimaryKeyAlias::is_alias(&key) {
                changes.push((key, value));
                continue;
            }
            let field = model
                .field_by_key(&key)
                .ok_or_else(|| unknown_field(model, &key))?;
            changes.push((field.name().to_string(), value));
        }

        for field in model.fields() {
            if changes.iter().any(|(name, _)| name == field.name()) {
                continue;
            }
            if let Some(default) = field.default_value() {
                changes.push((field.name().to_string(), default));
            }
        }

        instance.apply(changes, true)?;
        instance.check_required()?;
        instance.inner.state.write().unsaved = true;
        Ok(instance)
    }

    /// Build an instance from stored data. Unknown keys are skipped and no
    /// validation runs; the result is clean.
    pub(crate) fn load(model: &Model, data: Value) -> ModelResult<Instance> {
        let data = expect_object(data)?;
        let instance = Instance::blank(model);
        {
            let mut state = instance.inner.state.write();
            for (key, value) in data {
                if PrimaryKeyAlias::is_alias(&key) {
                    state.primary_key = non_null(value);
                    continue;
                }
                if let Some(field) = model.field_by_key(&key) {
                    state.values.insert(field.name().to_string(), field.coerce(value));
                }
            }
        }
        Ok(instance)
    }

    pub fn model(&self) -> &Model {
        &self.inner.model
    }

    /// Notifications for this instance
    pub fn events(&self) -> &EventBus<InstanceEvent> {
        &self.inner.events
    }

    /// Both handles refer to the same record state
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ==================
    // Reads
    // ==================

    /// Field value through its getter. Primary-key aliases read the primary key.
    /// Returns None for unknown fields and for absent values without a getter.
    pub fn get(&self, field: &str) -> Option<Value> {
        if PrimaryKeyAlias::is_alias(field) {
            return self.primary_key();
        }
        let spec = self.inner.model.field(field)?;
        let raw = self.inner.state.read().values.get(spec.name()).cloned();
        match spec.getter() {
            Some(getter) => Some(getter(raw.as_ref().unwrap_or(&Value::Null), spec.name(), self)),
            None => raw,
        }
    }

    /// Stored value, bypassing getters
    pub fn raw_value(&self, field: &str) -> Option<Value> {
        if PrimaryKeyAlias::is_alias(field) {
            return self.primary_key();
        }
        self.inner.state.read().values.get(field).cloned()
    }

    /// Current values in declaration order, optionally only changed ones
    pub fn values(&self, dirty_only: bool) -> Map<String, Value> {
        let state = self.inner.state.read();
        let mut out = Map::new();
        for field in self.inner.model.fields() {
            if dirty_only && !state.changed.iter().any(|c| c == field.name()) {
                continue;
            }
            if let Some(value) = state.values.get(field.name()) {
                out.insert(field.name().to_string(), value.clone());
            }
        }
        out
    }

    pub fn changed_fields(&self) -> Vec<String> {
        self.inner.state.read().changed.clone()
    }

    pub fn is_unsaved(&self) -> bool {
        self.inner.state.read().unsaved
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.state.read().deleted
    }

    pub fn status(&self) -> InstanceStatus {
        let state = self.inner.state.read();
        if state.deleted {
            InstanceStatus::Deleted
        } else if state.primary_key.is_none() {
            InstanceStatus::New
        } else if state.unsaved {
            InstanceStatus::Unsaved
        } else {
            InstanceStatus::Saved
        }
    }

    // ==================
    // Writes
    // ==================

    /// Set one field. Read-only fields are rejected.
    pub fn set(&self, field: &str, value: Value) -> ModelResult<()> {
        self.apply(vec![(field.to_string(), value)], false)
    }

    /// Set one field, read-only or not
    pub fn force_set(&self, field: &str, value: Value) -> ModelResult<()> {
        self.apply(vec![(field.to_string(), value)], true)
    }

    /// Set several fields atomically. Field validation failures are combined
    /// into one error; nothing is written unless every value passes.
    pub fn set_many(&self, values: Map<String, Value>, force: bool) -> ModelResult<()> {
        self.apply(values.into_iter().collect(), force)
    }

    /// Alias of [`Instance::set`] that marks the instance unsaved even when the value is unchanged
    pub fn change(&self, field: &str, value: Value) -> ModelResult<()> {
        self.set(field, value)?;
        self.inner.state.write().unsaved = true;
        Ok(())
    }

    // ==================
    // Primary key
    // ==================

    pub fn primary_key(&self) -> Option<Value> {
        self.inner.state.read().primary_key.clone()
    }

    pub fn set_primary_key(&self, value: Value) {
        self.inner.state.write().primary_key = non_null(value);
    }

    pub fn id(&self) -> Option<Value> {
        self.primary_key()
    }

    pub fn set_id(&self, value: Value) {
        self.set_primary_key(value)
    }

    pub fn alias(&self, _alias: PrimaryKeyAlias) -> Option<Value> {
        self.primary_key()
    }

    pub fn set_alias(&self, _alias: PrimaryKeyAlias, value: Value) {
        self.set_primary_key(value)
    }

    // ==================
    // Serialization
    // ==================

    /// Storage payload: storage-aliased keys, custom fields skipped,
    /// then the model's deserialize hook
    pub fn to_payload(&self) -> Map<String, Value> {
        let model = &self.inner.model;
        let mut payload = Map::new();
        {
            let state = self.inner.state.read();
            for field in model.fields().iter().filter(|f| !f.is_custom()) {
                if let Some(value) = state.values.get(field.name()) {
                    payload.insert(field.storage_name().to_string(), value.clone());
                }
            }
        }
        match model.deserializer() {
            Some(hook) => hook(payload, self, model).unwrap_or_default(),
            None => payload,
        }
    }

    /// Transport form: `id` first, then fields in declaration order under
    /// their declared names, with getters, mappings and nested models applied,
    /// then the model's serialize hook
    pub fn to_json(&self) -> Value {
        let model = &self.inner.model;
        let mut obj = Map::new();
        if let Some(pk) = self.primary_key() {
            obj.insert(PrimaryKeyAlias::Id.as_str().to_string(), pk);
        }

        let stored = self.inner.state.read().values.clone();
        for field in model.fields() {
            let raw = stored.get(field.name()).cloned();
            if raw.is_none() && field.getter().is_none() {
                continue;
            }
            if field.is_custom() && field.getter().is_none() {
                continue;
            }
            let mut value = match raw {
                Some(v) => self.nested_json(field, v),
                None => Value::Null,
            };
            if let Some(getter) = field.getter() {
                value = getter(&value, field.name(), self);
            }
            if let Some(get) = model.mapping(field.name()).and_then(|m| m.get.as_ref()) {
                value = get(&value, field.name(), self);
            }
            obj.insert(field.name().to_string(), value);
        }

        match model.serializer() {
            Some(hook) => hook(obj, self, model).map(Value::Object).unwrap_or(Value::Null),
            None => Value::Object(obj),
        }
    }

    fn nested_json(&self, field: &FieldSpec, value: Value) -> Value {
        let Some(child) = field
            .child_model()
            .and_then(|name| self.inner.model.registry().and_then(|r| r.get(name)))
        else {
            return value;
        };
        let render = |v: Value| match v {
            Value::Object(_) => child.instance(v, true).map(|i| i.to_json()).unwrap_or(Value::Null),
            other => other,
        };
        match value {
            Value::Array(items) => Value::Array(items.into_iter().map(render).collect()),
            other => render(other),
        }
    }

    // ==================
    // Actions
    // ==================

    /// Persist through the model's connector
    pub fn save(&self) -> ModelResult<Instance> {
        self.inner.model.save(self)
    }

    /// Delete through the model's connector
    pub fn delete(&self) -> ModelResult<Instance> {
        self.inner.model.delete(self)
    }

    /// Invoke a custom method attached to the model
    pub fn call(&self, method: &str, args: &[Value]) -> ModelResult<Value> {
        let f = self.inner.model.method(method).ok_or_else(|| {
            ModelError::InvalidArgument(format!(
                "model {} has no method \"{}\"",
                self.inner.model.name(),
                method
            ))
        })?;
        f(self, args)
    }

    // ==================
    // Lifecycle (crate-internal)
    // ==================

    /// Clean after a successful save
    pub(crate) fn mark_saved(&self) {
        let mut state = self.inner.state.write();
        state.changed.clear();
        state.unsaved = false;
    }

    pub(crate) fn mark_deleted(&self) {
        self.inner.state.write().deleted = true;
    }

    pub(crate) fn emit(&self, event: InstanceEvent) {
        self.inner.events.publish(&event);
    }

    // ==================
    // Write pipeline
    // ==================

    fn apply(&self, changes: Vec<(String, Value)>, force: bool) -> ModelResult<()> {
        let model = &self.inner.model;
        let mut staged: Vec<Staged> = Vec::with_capacity(changes.len());
        let mut primary_key = None;

        for (key, value) in changes {
            if PrimaryKeyAlias::is_alias(&key) {
                primary_key = Some(value);
                continue;
            }
            let (index, field) = model
                .field_position(&key)
                .ok_or_else(|| unknown_field(model, &key))?;
            if field.is_read_only() && !force {
                return Err(ModelError::ReadOnlyField(field.name().to_string()));
            }
            let value = self.transform(field, value)?;
            staged.retain(|s| s.index != index);
            staged.push(Staged {
                index,
                field: field.name().to_string(),
                value,
            });
        }

        if let Some(err) = combine_failures(model, &staged) {
            return Err(err);
        }

        if let Some(validator) = model.validator() {
            let mut proposed = self.values(false);
            for s in &staged {
                proposed.insert(s.field.clone(), s.value.clone());
            }
            if let Some(message) = validator(&Value::Object(proposed)) {
                return Err(ModelError::validation(model.name(), message));
            }
        }

        let mut events = Vec::new();
        {
            let mut state = self.inner.state.write();
            if let Some(pk) = primary_key {
                state.primary_key = non_null(pk);
            }
            for s in staged {
                let previous = state.values.get(&s.field).cloned();
                if previous.as_ref() == Some(&s.value) {
                    continue;
                }
                state.values.insert(s.field.clone(), s.value.clone());
                if !state.changed.contains(&s.field) {
                    state.changed.push(s.field.clone());
                }
                events.push(InstanceEvent::Change {
                    field: s.field,
                    value: s.value,
                    previous,
                });
            }
            if !events.is_empty() {
                state.unsaved = true;
            }
        }

        for event in &events {
            self.inner.events.publish(event);
        }
        Ok(())
    }

    /// Mapping setter, field setter, coercion, then nested model construction
    fn transform(&self, field: &FieldSpec, mut value: Value) -> ModelResult<Value> {
        let model = &self.inner.model;
        if let Some(set) = model.mapping(field.name()).and_then(|m| m.set.as_ref()) {
            value = set(&value, field.name(), self);
        }
        if let Some(setter) = field.setter() {
            value = setter(&value, field.name(), self);
        }
        value = field.coerce(value);

        let Some(child_name) = field.child_model() else {
            return Ok(value);
        };
        let Some(registry) = model.registry() else {
            return Ok(value);
        };
        let child = registry.get(child_name).ok_or_else(|| {
            ModelError::invalid_field(
                field.name(),
                format!("unknown model \"{}\" for field \"{}\"", child_name, field.name()),
            )
        })?;
        let build = |v: Value| -> ModelResult<Value> {
            match v {
                Value::Object(_) => Ok(Value::Object(child.instance(v, false)?.values(false))),
                other => Ok(other),
            }
        };
        match value {
            Value::Array(items) => Ok(Value::Array(
                items.into_iter().map(build).collect::<ModelResult<Vec<_>>>()?,
            )),
            other => build(other),
        }
    }

    fn check_required(&self) -> ModelResult<()> {
        let state = self.inner.state.read();
        for field in self.inner.model.fields() {
            if !field.is_required() || field.is_custom() {
                continue;
            }
            match state.values.get(field.name()) {
                None | Some(Value::Null) => {
                    return Err(ModelError::RequiredField(field.name().to_string()))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Required-field check against current values
    pub(crate) fn validate_required(&self) -> ModelResult<()> {
        self.check_required()
    }
}

/// One error naming every rejected field in declaration order, messages newline-joined
fn combine_failures(model: &Model, staged: &[Staged]) -> Option<ModelError> {
    let mut failures: Vec<(usize, &str, String)> = staged
        .iter()
        .filter_map(|s| {
            model.fields()[s.index]
                .check(&s.value)
                .map(|message| (s.index, s.field.as_str(), message))
        })
        .collect();
    if failures.is_empty() {
        return None;
    }
    failures.sort_by_key(|(index, _, _)| *index);
    Some(ModelError::Validation {
        fields: failures.iter().map(|(_, f, _)| f.to_string()).collect(),
        message: failures
            .iter()
            .map(|(_, _, m)| m.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

fn expect_object(data: Value) -> ModelResult<Map<String, Value>> {
    match data {
        Value::Null => Ok(Map::new()),
        Value::Object(obj) => Ok(obj),
        other => Err(ModelError::InvalidArgument(format!(
            "instance data must be an object, got: {}",
            other
        ))),
    }
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

fn unknown_field(model: &Model, key: &str) -> ModelError {
    ModelError::invalid_field(
        key,
        format!("unknown field \"{}\" for model {}", key, model.name()),
    )
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Instance")
            .field("model", &self.inner.model.name())
            .field("primary_key", &state.primary_key)
            .field("values", &state.values)
            .field("changed", &state.changed)
            .field("deleted", &state.deleted)
            .finish()
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
