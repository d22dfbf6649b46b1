//! Compiled model schema
//!
//! A `Model` is a cheap handle over immutable compiled state plus the few
//! pieces that stay mutable after definition: the bound connector, the
//! metadata map and the cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::definition::{ConnectorRef, MappingDef, MethodFn, ModelDefinition, SerializeFn};
use super::hooks::{HookDefinition, OperationHooks};
use crate::cache::{CacheConfig, CacheLayer, CacheProvider};
use crate::connector::{Connector, Operation};
use crate::errors::{ModelError, ModelResult, NameViolation};
use crate::events::{EventBus, HookPhase, ModelEvent};
use crate::instance::Instance;
use crate::observability::Event;
use crate::registry::{ModelRegistry, RegistryInner};
use crate::schema::{compile_field, Accessor, FieldFn, FieldSpec, FunctionRegistry, ValidatorDef, ValidatorFn};

const INVALID_EXTEND: &str =
    "invalid argument passed to extend. Must either be a model class or model definition";

/// Compiled mapping accessors for one field
#[derive(Clone, Default)]
pub(crate) struct CompiledMapping {
    pub(crate) get: Option<Accessor>,
    pub(crate) set: Option<Accessor>,
}

pub(crate) struct ModelInner {
    name: String,
    fields: Vec<FieldSpec>,
    definition: ModelDefinition,
    connector: RwLock<Option<Arc<dyn Connector>>>,
    pub(crate) cache: CacheLayer,
    metadata: RwLock<Map<String, Value>>,
    actions: Option<Vec<String>>,
    disabled_actions: Option<Vec<String>>,
    hooks: HookDefinition,
    mappings: HashMap<String, CompiledMapping>,
    validator: Option<ValidatorFn>,
    serializer: Option<SerializeFn>,
    deserializer: Option<SerializeFn>,
    methods: HashMap<String, MethodFn>,
    events: EventBus<ModelEvent>,
    functions: Arc<FunctionRegistry>,
    registry: Weak<RegistryInner>,
}

/// Compiled, named record type
#[derive(Clone)]
pub struct Model {
    pub(crate) inner: Arc<ModelInner>,
}

/// What a model is extended with
#[derive(Debug, Clone)]
pub enum ExtendSource {
    Definition(ModelDefinition),
    Model(Model),
    Json(Value),
}

impl From<ModelDefinition> for ExtendSource {
    fn from(def: ModelDefinition) -> Self {
        ExtendSource::Definition(def)
    }
}

impl From<Model> for ExtendSource {
    fn from(model: Model) -> Self {
        ExtendSource::Model(model)
    }
}

impl From<Value> for ExtendSource {
    fn from(value: Value) -> Self {
        ExtendSource::Json(value)
    }
}

/// Reject names that would need URL encoding, then names with periods
pub fn validate_model_name(name: &str) -> ModelResult<()> {
    if name.is_empty() {
        return Err(ModelError::InvalidArgument("model name cannot be empty".to_string()));
    }
    let url_safe = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
    if !name.chars().all(url_safe) {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
            violation: NameViolation::UrlUnsafe,
        });
    }
    if name.contains('.') {
        return Err(ModelError::InvalidName {
            name: name.to_string(),
            violation: NameViolation::Period,
        });
    }
    Ok(())
}

impl Model {
    /// Compile a definition. Registration is the caller's job.
    pub(crate) fn compile(name: &str, definition: ModelDefinition, registry: &ModelRegistry) -> ModelResult<Model> {
        validate_model_name(name)?;
        let functions = registry.functions();

        let fields = definition
            .fields
            .iter()
            .map(|(field, def)| compile_field(field, def, &functions))
            .collect::<ModelResult<Vec<_>>>()?;

        let connector = match &definition.connector {
            None => None,
            Some(ConnectorRef::Instance(c)) => Some(Arc::clone(c)),
            Some(ConnectorRef::Named(n)) => Some(registry.connector(n).ok_or_else(|| {
                ModelError::InvalidArgument(format!("unknown connector \"{}\"", n))
            })?),
        };

        let mut mappings = HashMap::new();
        for (field, mapping) in &definition.mappings {
            if !fields.iter().any(|f| f.name() == field) {
                return Err(ModelError::invalid_field(
                    field.as_str(),
                    format!("mapping refers to unknown field \"{}\"", field),
                ));
            }
            mappings.insert(field.clone(), compile_mapping(field, mapping, &functions)?);
        }

        let validator = match &definition.validator {
            None => None,
            Some(ValidatorDef::Function(f)) => Some(Arc::clone(f)),
            Some(ValidatorDef::Named(n)) => Some(
                functions
                    .resolve_validator(n)
                    .map_err(ModelError::InvalidArgument)?,
            ),
            Some(ValidatorDef::Pattern(_)) => {
                return Err(ModelError::InvalidArgument(
                    "model validator must be a function".to_string(),
                ))
            }
        };

        let cache = CacheLayer::new(definition.cache.as_ref().unwrap_or(&CacheConfig::Off));

        let model = Model {
            inner: Arc::new(ModelInner {
                name: name.to_string(),
                fields,
                connector: RwLock::new(connector.clone()),
                cache,
                metadata: RwLock::new(definition.metadata.clone().unwrap_or_default()),
                actions: definition.actions.clone(),
                disabled_actions: definition.disabled_actions.clone(),
                hooks: definition.hooks.clone(),
                mappings,
                validator,
                serializer: definition.serialize.clone(),
                deserializer: definition.deserialize.clone(),
                methods: definition
                    .methods
                    .iter()
                    .map(|(n, f)| (n.clone(), Arc::clone(f)))
                    .collect(),
                events: EventBus::new(),
                functions,
                registry: registry.downgrade(),
                definition,
            }),
        };

        if let Some(connector) = connector {
            model.bind(&connector);
        }
        Ok(model)
    }

    fn bind(&self, connector: &Arc<dyn Connector>) {
        connector.init_model(self);
        debug!(
            target: "aeromodel::connector",
            event = %Event::ConnectorBound,
            model = %self.name(),
            connector = connector.name()
        );
    }

    // ==================
    // Introspection
    // ==================

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Compiled fields in declaration order
    pub fn fields(&self) -> &[FieldSpec] {
        &self.inner.fields
    }

    /// Field by declared name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.inner.fields.iter().find(|f| f.name() == name)
    }

    /// Field by declared name, or by storage alias when no name matches
    pub fn field_by_key(&self, key: &str) -> Option<&FieldSpec> {
        self.field_position(key).map(|(_, f)| f)
    }

    pub(crate) fn field_position(&self, key: &str) -> Option<(usize, &FieldSpec)> {
        let fields = &self.inner.fields;
        fields
            .iter()
            .position(|f| f.name() == key)
            .or_else(|| fields.iter().position(|f| f.storage_name() == key))
            .map(|i| (i, &fields[i]))
    }

    /// Declared field names in order
    pub fn keys(&self) -> Vec<String> {
        self.inner.fields.iter().map(|f| f.name().to_string()).collect()
    }

    /// Storage names of every non-custom field
    pub fn payload_keys(&self) -> Vec<String> {
        self.inner
            .fields
            .iter()
            .filter(|f| !f.is_custom())
            .map(|f| f.storage_name().to_string())
            .collect()
    }

    /// Rename declared keys to storage names. Unknown keys pass through; custom fields are dropped.
    pub fn translate_keys_for_payload(&self, values: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (key, value) in values {
            match self.field(key) {
                Some(f) if f.is_custom() => {}
                Some(f) => {
                    out.insert(f.storage_name().to_string(), value.clone());
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    /// New instance of this model. `from_store` skips unknown keys and validation.
    pub fn instance(&self, data: Value, from_store: bool) -> ModelResult<Instance> {
        if from_store {
            Instance::load(self, data)
        } else {
            Instance::create(self, data)
        }
    }

    /// The definition this model was compiled from
    pub fn definition(&self) -> &ModelDefinition {
        &self.inner.definition
    }

    /// Derive and register a new model with the union of fields; connector inherited
    pub fn extend(&self, name: &str, source: impl Into<ExtendSource>) -> ModelResult<Model> {
        let added = match source.into() {
            ExtendSource::Definition(def) => def,
            ExtendSource::Model(model) => model.inner.definition.clone(),
            ExtendSource::Json(value @ Value::Object(_)) => ModelDefinition::from_json(&value)?,
            ExtendSource::Json(_) => {
                return Err(ModelError::InvalidArgument(INVALID_EXTEND.to_string()))
            }
        };
        let merged = self.inner_definition_with_connector().merged_with(&added);
        self.registry_handle()?.define(name, merged)
    }

    /// Derive and register a new model with only the fields named in `definition`
    pub fn reduce(&self, name: &str, definition: ModelDefinition) -> ModelResult<Model> {
        let reduced = self.inner_definition_with_connector().reduced_to(&definition);
        self.registry_handle()?.define(name, reduced)
    }

    /// Definition carrying the currently bound connector
    fn inner_definition_with_connector(&self) -> ModelDefinition {
        let mut def = self.inner.definition.clone();
        if let Some(c) = self.connector() {
            def.connector = Some(ConnectorRef::Instance(c));
        }
        def.metadata = Some(self.inner.metadata.read().clone());
        def
    }

    fn registry_handle(&self) -> ModelResult<ModelRegistry> {
        self.registry().ok_or_else(|| {
            ModelError::InvalidArgument(format!(
                "registry of model {} is no longer available",
                self.name()
            ))
        })
    }

    // ==================
    // Metadata and actions
    // ==================

    fn meta_scope(&self) -> String {
        self.connector()
            .map(|c| c.name().to_string())
            .unwrap_or_default()
    }

    /// `metadata[<connector name>][key]`, else `default`, else Null
    pub fn get_meta(&self, key: &str, default: Option<Value>) -> Value {
        let scope = self.meta_scope();
        self.inner
            .metadata
            .read()
            .get(&scope)
            .and_then(|m| m.get(key))
            .cloned()
            .or(default)
            .unwrap_or(Value::Null)
    }

    pub fn set_meta(&self, key: &str, value: Value) {
        let scope = self.meta_scope();
        let mut metadata = self.inner.metadata.write();
        let entry = metadata
            .entry(scope)
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(m) = entry {
            m.insert(key.to_string(), value);
        }
    }

    pub fn actions(&self) -> Option<&[String]> {
        self.inner.actions.as_deref()
    }

    pub fn disabled_actions(&self) -> Option<&[String]> {
        self.inner.disabled_actions.as_deref()
    }

    /// Effective hook names for `op`
    pub fn hooks(&self, op: Operation) -> OperationHooks {
        self.inner.hooks.resolve(op)
    }

    // ==================
    // Connector and cache
    // ==================

    pub fn connector(&self) -> Option<Arc<dyn Connector>> {
        self.inner.connector.read().clone()
    }

    /// Rebind to another connector. The cache is dropped.
    pub fn set_connector(&self, connector: Arc<dyn Connector>) {
        *self.inner.connector.write() = Some(Arc::clone(&connector));
        self.inner.cache.reset(self.name());
        self.bind(&connector);
    }

    pub fn cache(&self) -> Option<Arc<dyn CacheProvider>> {
        self.inner.cache.provider()
    }

    /// Whether the generated operation exists for the bound connector
    pub fn supports(&self, op: Operation) -> bool {
        self.connector()
            .map(|c| c.capabilities().contains(op))
            .unwrap_or(false)
    }

    /// Generated operations, in declaration order
    pub fn operations(&self) -> Vec<Operation> {
        self.connector()
            .map(|c| c.capabilities().operations())
            .unwrap_or_default()
    }

    // ==================
    // Wiring
    // ==================

    /// Operation hook notifications
    pub fn events(&self) -> &EventBus<ModelEvent> {
        &self.inner.events
    }

    pub fn registry(&self) -> Option<ModelRegistry> {
        self.inner.registry.upgrade().map(ModelRegistry::from_inner)
    }

    pub fn method(&self, name: &str) -> Option<MethodFn> {
        self.inner.methods.get(name).cloned()
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub(crate) fn mapping(&self, field: &str) -> Option<&CompiledMapping> {
        self.inner.mappings.get(field)
    }

    pub(crate) fn validator(&self) -> Option<&ValidatorFn> {
        self.inner.validator.as_ref()
    }

    pub(crate) fn serializer(&self) -> Option<&SerializeFn> {
        self.inner.serializer.as_ref()
    }

    pub(crate) fn deserializer(&self) -> Option<&SerializeFn> {
        self.inner.deserializer.as_ref()
    }

    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Publish a hook event when one is configured for this phase
    pub(crate) fn fire<F>(&self, phase: HookPhase, op: Operation, payload: F)
    where
        F: FnOnce() -> Value,
    {
        let hooks = self.inner.hooks.resolve(op);
        let name = match phase {
            HookPhase::Before => hooks.before_event,
            HookPhase::After => hooks.after_event,
        };
        let Some(event) = name else {
            return;
        };

        let mut payload = payload();
        if phase == HookPhase::After {
            if let Some(transform) = hooks
                .transformer
                .as_deref()
                .and_then(|t| self.inner.functions.transformer(t))
            {
                payload = transform(payload);
            }
        }
        self.inner.events.publish(&ModelEvent {
            event,
            phase,
            operation: op,
            payload,
        });
    }

    /// Compiled schema as JSON
    pub fn describe(&self) -> Value {
        let mut fields = Map::new();
        for f in &self.inner.fields {
            fields.insert(f.name().to_string(), f.describe());
        }
        let mut obj = Map::new();
        obj.insert("name".into(), json!(self.name()));
        obj.insert("fields".into(), Value::Object(fields));
        obj.insert("payloadKeys".into(), json!(self.payload_keys()));
        if let Some(c) = self.connector() {
            obj.insert("connector".into(), json!(c.name()));
            obj.insert(
                "operations".into(),
                json!(self.operations().iter().map(|op| op.as_str()).collect::<Vec<_>>()),
            );
        }
        if let Some(actions) = self.actions() {
            obj.insert("actions".into(), json!(actions));
        }
        if let Some(actions) = self.disabled_actions() {
            obj.insert("disabledActions".into(), json!(actions));
        }
        let hooks = self.inner.hooks.describe();
        if hooks.as_object().is_some_and(|h| !h.is_empty()) {
            obj.insert("hooks".into(), hooks);
        }
        Value::Object(obj)
    }

    pub(crate) fn log_registered(&self) {
        info!(
            target: "aeromodel::registry",
            event = %Event::ModelRegistered,
            model = %self.name(),
            fields = self.inner.fields.len()
        );
    }
}

fn compile_mapping(field: &str, mapping: &MappingDef, functions: &FunctionRegistry) -> ModelResult<CompiledMapping> {
    let resolve = |f: &Option<FieldFn>| -> ModelResult<Option<Accessor>> {
        match f {
            None => Ok(None),
            Some(FieldFn::Function(f)) => Ok(Some(Arc::clone(f))),
            Some(FieldFn::Named(expr)) => functions
                .resolve_accessor(expr)
                .map(Some)
                .map_err(|e| ModelError::invalid_field(field, format!("mapping for \"{}\": {}", field, e))),
        }
    };
    Ok(CompiledMapping {
        get: resolve(&mapping.get)?,
        set: resolve(&mapping.set)?,
    })
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.inner.name)
            .field("fields", &self.keys())
            .field("connector", &self.connector().map(|c| c.name().to_string()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{Capabilities, MemoryConnector};
    use crate::schema::{FieldDef, FieldType};

    #[test]
    fn test_name_rules() {
        assert!(validate_model_name("user").is_ok());
        assert!(validate_model_name("user-profile_2").is_ok());

        let err = validate_model_name("my model").unwrap_err();
        assert!(err.to_string().contains("encoded in a URL"));
        let err = validate_model_name("my.model").unwrap_err();
        assert_eq!(err.to_string(), "Model names cannot contain periods: \"my.model\"");
        let err = validate_model_name("my model.v2").unwrap_err();
        assert!(err.to_string().contains("encoded in a URL"));
        assert!(validate_model_name("かくざ").is_err());
    }

    #[test]
    fn test_keys_and_payload_keys() {
        let registry = ModelRegistry::empty();
        let model = registry
            .define(
                "user",
                ModelDefinition::new()
                    .field("name", FieldDef::of(FieldType::String).named("thename"))
                    .field("age", FieldDef::of(FieldType::Number))
                    .field("label", FieldDef::of(FieldType::String).custom()),
            )
            .unwrap();
        assert_eq!(model.keys(), vec!["name", "age", "label"]);
        assert_eq!(model.payload_keys(), vec!["thename", "age"]);

        let translated = model.translate_keys_for_payload(
            json!({"name": "a", "label": "x", "other": 1}).as_object().unwrap(),
        );
        assert_eq!(Value::Object(translated), json!({"thename": "a", "other": 1}));
    }

    #[test]
    fn test_meta_scoped_by_connector() {
        let registry = ModelRegistry::new();
        let mut meta = Map::new();
        meta.insert("memory".into(), json!({"foo": "bar"}));
        let model = registry
            .define("user", ModelDefinition::new().connector_named("memory").metadata(meta))
            .unwrap();
        assert_eq!(model.get_meta("foo", None), json!("bar"));
        assert_eq!(model.get_meta("nope", None), Value::Null);
        assert_eq!(model.get_meta("nope", Some(json!("dflt"))), json!("dflt"));
        model.set_meta("nope", json!(1));
        assert_eq!(model.get_meta("nope", None), json!(1));
    }

    #[test]
    fn test_unknown_named_connector() {
        let registry = ModelRegistry::empty();
        let err = registry
            .define("user", ModelDefinition::new().connector_named("postgres"))
            .unwrap_err();
        assert_eq!(err.code(), "MODEL_INVALID_ARGUMENT");
    }

    #[test]
    fn test_operations_follow_capabilities() {
        let registry = ModelRegistry::empty();
        let connector = Arc::new(MemoryConnector::with_capabilities(
            Capabilities::all().without(Operation::DeleteAll),
        ));
        let model = registry
            .define("user", ModelDefinition::new().connector(connector))
            .unwrap();
        assert!(model.supports(Operation::Create));
        assert!(!model.supports(Operation::DeleteAll));
        assert!(!model.operations().contains(&Operation::DeleteAll));

        let bare = registry.define("bare", ModelDefinition::new()).unwrap();
        assert!(bare.operations().is_empty());
    }

    #[test]
    fn test_pattern_model_validator_rejected() {
        let registry = ModelRegistry::empty();
        let mut def = ModelDefinition::new();
        def.validator = Some(ValidatorDef::Pattern("/x/".into()));
        assert!(registry.define("user", def).is_err());
    }

    #[test]
    fn test_extend_rejects_non_object() {
        let registry = ModelRegistry::empty();
        let model = registry.define("user", ModelDefinition::new()).unwrap();
        let err = model.extend("other", json!("nope")).unwrap_err();
        assert_eq!(err.to_string(), INVALID_EXTEND);
    }

    #[test]
    fn test_cached_model_freed_after_clear() {
        let registry = ModelRegistry::new();
        let model = registry
            .define(
                "user",
                ModelDefinition::new()
                    .field("name", FieldDef::of(FieldType::String))
                    .connector_named("memory")
                    .cache(CacheConfig::Default),
            )
            .unwrap();
        model.create(json!({"name": "a"})).unwrap();
        model.find_all().unwrap();
        model.find_by_id(&json!(1)).unwrap();

        let weak = Arc::downgrade(&model.inner);
        drop(model);
        registry.clear();
        assert!(weak.upgrade().is_none());
    }
}
