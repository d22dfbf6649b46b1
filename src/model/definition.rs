//! Raw model declarations
//!
//! A `ModelDefinition` is built in code or read from JSON and compiled by
//! [`ModelRegistry::define`](crate::registry::ModelRegistry::define).

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::hooks::HookDefinition;
use super::model::Model;
use crate::cache::CacheConfig;
use crate::connector::{Connector, Operation};
use crate::errors::{ModelError, ModelResult};
use crate::instance::Instance;
use crate::schema::{FieldDef, FieldFn, ValidatorDef};

/// serialize/deserialize hook: `(object, instance, model) -> object`.
/// Returning None drops the object.
pub type SerializeFn =
    Arc<dyn Fn(Map<String, Value>, &Instance, &Model) -> Option<Map<String, Value>> + Send + Sync>;

/// Custom method callable on every instance
pub type MethodFn = Arc<dyn Fn(&Instance, &[Value]) -> ModelResult<Value> + Send + Sync>;

/// Connector given directly or by registered name
#[derive(Clone)]
pub enum ConnectorRef {
    Instance(Arc<dyn Connector>),
    Named(String),
}

impl fmt::Debug for ConnectorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorRef::Instance(c) => write!(f, "Instance({})", c.name()),
            ConnectorRef::Named(name) => write!(f, "Named({:?})", name),
        }
    }
}

/// Model-level `get`/`set` mapping of one field
#[derive(Debug, Clone, Default)]
pub struct MappingDef {
    /// Applied in `to_json`
    pub get: Option<FieldFn>,
    /// Applied on every write
    pub set: Option<FieldFn>,
}

/// Uncompiled model declaration
#[derive(Clone, Default)]
pub struct ModelDefinition {
    pub(crate) fields: Vec<(String, FieldDef)>,
    pub(crate) connector: Option<ConnectorRef>,
    pub(crate) cache: Option<CacheConfig>,
    pub(crate) metadata: Option<Map<String, Value>>,
    pub(crate) actions: Option<Vec<String>>,
    pub(crate) disabled_actions: Option<Vec<String>>,
    pub(crate) hooks: HookDefinition,
    pub(crate) mappings: Vec<(String, MappingDef)>,
    pub(crate) validator: Option<ValidatorDef>,
    pub(crate) serialize: Option<SerializeFn>,
    pub(crate) deserialize: Option<SerializeFn>,
    pub(crate) methods: Vec<(String, MethodFn)>,
}

impl fmt::Debug for ModelDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDefinition")
            .field("fields", &self.fields)
            .field("connector", &self.connector)
            .field("cache", &self.cache)
            .field("actions", &self.actions)
            .field("hooks", &self.hooks)
            .field("mappings", &self.mappings)
            .field("methods", &self.methods.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, replacing a previous declaration of the same name in place
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.fields.push((name, def)),
        }
        self
    }

    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(ConnectorRef::Instance(connector));
        self
    }

    /// Connector resolved by name through the registry at compile time
    pub fn connector_named(mut self, name: impl Into<String>) -> Self {
        self.connector = Some(ConnectorRef::Named(name.into()));
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Metadata keyed by connector name
    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    pub fn disabled_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disabled_actions = Some(actions.into_iter().map(Into::into).collect());
        self
    }

    /// Event published before every operation, unless overridden per operation
    pub fn before_event(mut self, name: impl Into<String>) -> Self {
        self.hooks.for_op(None).before_event = Some(name.into());
        self
    }

    pub fn after_event(mut self, name: impl Into<String>) -> Self {
        self.hooks.for_op(None).after_event = Some(name.into());
        self
    }

    pub fn event_transformer(mut self, name: impl Into<String>) -> Self {
        self.hooks.for_op(None).transformer = Some(name.into());
        self
    }

    pub fn before_event_for(mut self, op: Operation, name: impl Into<String>) -> Self {
        self.hooks.for_op(Some(op)).before_event = Some(name.into());
        self
    }

    pub fn after_event_for(mut self, op: Operation, name: impl Into<String>) -> Self {
        self.hooks.for_op(Some(op)).after_event = Some(name.into());
        self
    }

    pub fn event_transformer_for(mut self, op: Operation, name: impl Into<String>) -> Self {
        self.hooks.for_op(Some(op)).transformer = Some(name.into());
        self
    }

    pub fn mapping(mut self, field: impl Into<String>, mapping: MappingDef) -> Self {
        let field = field.into();
        self.mappings.retain(|(f, _)| *f != field);
        self.mappings.push((field, mapping));
        self
    }

    /// Whole-instance validator over the proposed values object
    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.validator = Some(ValidatorDef::Function(Arc::new(f)));
        self
    }

    pub fn validator_named(mut self, name: impl Into<String>) -> Self {
        self.validator = Some(ValidatorDef::Named(name.into()));
        self
    }

    /// Post-process `to_json`
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Map<String, Value>, &Instance, &Model) -> Option<Map<String, Value>> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    /// Post-process `to_payload`
    pub fn deserialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Map<String, Value>, &Instance, &Model) -> Option<Map<String, Value>> + Send + Sync + 'static,
    {
        self.deserialize = Some(Arc::new(f));
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> ModelResult<Value> + Send + Sync + 'static,
    {
        let name = name.into();
        self.methods.retain(|(n, _)| *n != name);
        self.methods.push((name, Arc::new(f)));
        self
    }

    /// Declared field names in order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Overlay `added` onto this definition. A field replaces the base field
    /// with the same name or whose name equals its storage alias; everything
    /// else set in `added` overrides the base.
    pub(crate) fn merged_with(&self, added: &ModelDefinition) -> ModelDefinition {
        let mut merged = self.clone();

        for (name, def) in &added.fields {
            let replaces = |base: &str| base == name || def.storage_name() == Some(base);
            match merged.fields.iter().position(|(n, _)| replaces(n.as_str())) {
                Some(at) => {
                    merged.fields.retain(|(n, _)| !replaces(n.as_str()));
                    let at = at.min(merged.fields.len());
                    merged.fields.insert(at, (name.clone(), def.clone()));
                }
                None => merged.fields.push((name.clone(), def.clone())),
            }
        }

        if added.connector.is_some() {
            merged.connector = added.connector.clone();
        }
        if added.cache.is_some() {
            merged.cache = added.cache.clone();
        }
        if let Some(meta) = &added.metadata {
            let mut base = merged.metadata.take().unwrap_or_default();
            for (k, v) in meta {
                base.insert(k.clone(), v.clone());
            }
            merged.metadata = Some(base);
        }
        if added.actions.is_some() {
            merged.actions = added.actions.clone();
        }
        if added.disabled_actions.is_some() {
            merged.disabled_actions = added.disabled_actions.clone();
        }
        merged.hooks = merged.hooks.merge(&added.hooks);
        for (field, mapping) in &added.mappings {
            merged = merged.mapping(field.clone(), mapping.clone());
        }
        if added.validator.is_some() {
            merged.validator = added.validator.clone();
        }
        if added.serialize.is_some() {
            merged.serialize = added.serialize.clone();
        }
        if added.deserialize.is_some() {
            merged.deserialize = added.deserialize.clone();
        }
        for (name, f) in &added.methods {
            merged.methods.retain(|(n, _)| n != name);
            merged.methods.push((name.clone(), Arc::clone(f)));
        }
        merged
    }

    /// Keep everything but the fields, which come only from `reduced`
    pub(crate) fn reduced_to(&self, reduced: &ModelDefinition) -> ModelDefinition {
        let mut out = self.merged_with(&ModelDefinition {
            fields: Vec::new(),
            ..reduced.clone()
        });
        out.fields = reduced.fields.clone();
        let names: Vec<String> = out.fields.iter().map(|(n, _)| n.clone()).collect();
        out.mappings.retain(|(f, _)| names.contains(f));
        out
    }

    /// Parse a definition from its JSON form.
    ///
    /// Recognized keys: `fields`, `connector` (registered name), `cache`,
    /// `metadata`, `actions`, `disabledActions`, `mappings`, `validator`
    /// (registered name) and the hook keys.
    pub fn from_json(value: &Value) -> ModelResult<ModelDefinition> {
        let obj = match value {
            Value::Null => return Err(ModelError::MissingDefinition),
            Value::Object(obj) => obj,
            other => {
                return Err(ModelError::InvalidArgument(format!(
                    "model definition must be an object, got: {}",
                    other
                )))
            }
        };

        let mut def = ModelDefinition::new();
        for (key, v) in obj {
            if def.hooks.read_key(key, v)? {
                continue;
            }
            match key.as_str() {
                "fields" => {
                    let fields = v.as_object().ok_or_else(|| {
                        ModelError::InvalidArgument("fields must be an object".to_string())
                    })?;
                    for (name, field) in fields {
                        def.fields.push((name.clone(), FieldDef::from_json(name, field)?));
                    }
                }
                "connector" => {
                    def.connector = match v {
                        Value::Null => None,
                        Value::String(name) => Some(ConnectorRef::Named(name.clone())),
                        other => {
                            return Err(ModelError::InvalidArgument(format!(
                                "connector must be a registered connector name, got: {}",
                                other
                            )))
                        }
                    }
                }
                "cache" => def.cache = Some(CacheConfig::from_json(v)?),
                "metadata" => {
                    def.metadata = match v {
                        Value::Null => None,
                        Value::Object(m) => Some(m.clone()),
                        _ => {
                            return Err(ModelError::InvalidArgument(
                                "metadata must be an object".to_string(),
                            ))
                        }
                    }
                }
                "actions" => def.actions = string_list("actions", v)?,
                "disabledActions" => def.disabled_actions = string_list("disabledActions", v)?,
                "mappings" => {
                    let mappings = v.as_object().ok_or_else(|| {
                        ModelError::InvalidArgument("mappings must be an object".to_string())
                    })?;
                    for (field, m) in mappings {
                        let get = m.get("get").and_then(Value::as_str).map(|s| FieldFn::Named(s.to_string()));
                        let set = m.get("set").and_then(Value::as_str).map(|s| FieldFn::Named(s.to_string()));
                        def.mappings.push((field.clone(), MappingDef { get, set }));
                    }
                }
                "validator" => {
                    def.validator = match v {
                        Value::Null => None,
                        Value::String(name) => Some(ValidatorDef::Named(name.clone())),
                        _ => {
                            return Err(ModelError::InvalidArgument(
                                "model validator must be a registered validator name".to_string(),
                            ))
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(def)
    }
}

fn string_list(key: &str, value: &Value) -> ModelResult<Option<Vec<String>>> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| ModelError::InvalidArgument(format!("{} must be an array of strings", key)))
            })
            .collect::<ModelResult<Vec<_>>>()
            .map(Some),
        _ => Err(ModelError::InvalidArgument(format!("{} must be an array", key))),
    }
}
