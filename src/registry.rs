//! Explicit model registry
//!
//! The registry owns every compiled model, the named connectors models can
//! refer to, and the function registry used to resolve named field logic.
//! Callers create one per context (a server, a test) and pass it around.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info};

use crate::connector::{Connector, MemoryConnector};
use crate::errors::{ModelError, ModelResult};
use crate::events::{EventBus, RegistryEvent};
use crate::model::{Model, ModelDefinition};
use crate::observability::Event;
use crate::schema::FunctionRegistry;

pub(crate) struct RegistryInner {
    models: RwLock<Vec<Model>>,
    connectors: RwLock<Vec<Arc<dyn Connector>>>,
    functions: Arc<FunctionRegistry>,
    events: EventBus<RegistryEvent>,
}

/// Shared handle to a set of models
#[derive(Clone)]
pub struct ModelRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Registry with the in-memory connector registered as `memory`
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_connector(Arc::new(MemoryConnector::new()));
        registry
    }

    /// Registry without any connectors
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                models: RwLock::new(Vec::new()),
                connectors: RwLock::new(Vec::new()),
                functions: Arc::new(FunctionRegistry::new()),
                events: EventBus::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<RegistryInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    /// Compile and register a model, replacing any model of the same name
    pub fn define(&self, name: &str, definition: ModelDefinition) -> ModelResult<Model> {
        let model = Model::compile(name, definition, self)?;
        self.register(model.clone());
        Ok(model)
    }

    /// Compile and register a model from its JSON definition
    pub fn define_json(&self, name: &str, definition: &Value) -> ModelResult<Model> {
        self.define(name, ModelDefinition::from_json(definition)?)
    }

    /// Define every `name -> definition` entry of a JSON object, in order.
    /// Child models referenced by `model` must come first.
    pub fn load_definitions(&self, definitions: &Value) -> ModelResult<Vec<Model>> {
        let obj = definitions.as_object().ok_or_else(|| {
            ModelError::InvalidArgument("model definitions must be an object".to_string())
        })?;
        let models = obj
            .iter()
            .map(|(name, def)| self.define_json(name, def))
            .collect::<ModelResult<Vec<_>>>()?;
        info!(
            target: "aeromodel::registry",
            event = %Event::DefinitionsLoaded,
            count = models.len()
        );
        Ok(models)
    }

    fn register(&self, model: Model) {
        {
            let mut models = self.inner.models.write();
            match models.iter_mut().find(|m| m.name() == model.name()) {
                Some(slot) => *slot = model.clone(),
                None => models.push(model.clone()),
            }
        }
        model.log_registered();
        self.inner.events.publish(&RegistryEvent::Registered(model));
    }

    pub fn get(&self, name: &str) -> Option<Model> {
        self.inner
            .models
            .read()
            .iter()
            .find(|m| m.name() == name)
            .cloned()
    }

    /// Registered models in registration order
    pub fn models(&self) -> Vec<Model> {
        self.inner.models.read().clone()
    }

    pub fn model_names(&self) -> Vec<String> {
        self.inner
            .models
            .read()
            .iter()
            .map(|m| m.name().to_string())
            .collect()
    }

    /// Remove every model
    pub fn clear(&self) {
        self.inner.models.write().clear();
        debug!(target: "aeromodel::registry", event = %Event::RegistryCleared);
        self.inner.events.publish(&RegistryEvent::Cleared);
    }

    /// Make a connector available to definitions by name, replacing one of the same name
    pub fn register_connector(&self, connector: Arc<dyn Connector>) {
        let mut connectors = self.inner.connectors.write();
        connectors.retain(|c| c.name() != connector.name());
        connectors.push(connector);
    }

    pub fn connector(&self, name: &str) -> Option<Arc<dyn Connector>> {
        self.inner
            .connectors
            .read()
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Named getters, setters, validators and transformers
    pub fn functions(&self) -> Arc<FunctionRegistry> {
        Arc::clone(&self.inner.functions)
    }

    /// Registration notifications
    pub fn events(&self) -> &EventBus<RegistryEvent> {
        &self.inner.events
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.model_names())
            .field(
                "connectors",
                &self
                    .inner
                    .connectors
                    .read()
                    .iter()
                    .map(|c| c.name().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDef, FieldType};
    use parking_lot::Mutex;
    use serde_json::json;

    #[test]
    fn test_define_and_get() {
        let registry = ModelRegistry::new();
        let model = registry
            .define("user", ModelDefinition::new().field("name", FieldDef::of(FieldType::String)))
            .unwrap();
        assert!(registry.get("user").unwrap().ptr_eq(&model));
        assert!(registry.get("car").is_none());
    }

    #[test]
    fn test_redefine_replaces() {
        let registry = ModelRegistry::empty();
        registry.define("user", ModelDefinition::new()).unwrap();
        let second = registry
            .define("user", ModelDefinition::new().field("age", FieldDef::of(FieldType::Number)))
            .unwrap();
        assert_eq!(registry.models().len(), 1);
        assert!(registry.get("user").unwrap().ptr_eq(&second));
    }

    #[test]
    fn test_registered_event() {
        let registry = ModelRegistry::empty();
        let names = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&names);
        registry.events().subscribe(move |e| {
            if let RegistryEvent::Registered(model) = e {
                sink.lock().push(model.name().to_string());
            }
        });
        registry.define("user", ModelDefinition::new()).unwrap();
        assert_eq!(*names.lock(), vec!["user"]);
    }

    #[test]
    fn test_clear() {
        let registry = ModelRegistry::empty();
        registry.define("user", ModelDefinition::new()).unwrap();
        registry.clear();
        assert!(registry.models().is_empty());
    }

    #[test]
    fn test_failed_define_registers_nothing() {
        let registry = ModelRegistry::empty();
        assert!(registry
            .define("user", ModelDefinition::new().field("id", FieldDef::of(FieldType::String)))
            .is_err());
        assert!(registry.get("user").is_none());
    }

    #[test]
    fn test_load_definitions() {
        let registry = ModelRegistry::new();
        let models = registry
            .load_definitions(&json!({
                "address": {"fields": {"street": {"type": "string"}}},
                "user": {
                    "fields": {
                        "name": {"type": "string", "required": true},
                        "address": {"model": "address"}
                    },
                    "connector": "memory"
                }
            }))
            .unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(registry.model_names(), vec!["address", "user"]);
        assert!(registry.load_definitions(&json!([])).is_err());
    }

    #[test]
    fn test_memory_connector_registered() {
        assert!(ModelRegistry::new().connector("memory").is_some());
        assert!(ModelRegistry::empty().connector("memory").is_none());
    }
}
