//! Named field functions
//!
//! Getters, setters, validators and event transformers that are referred
//! to by name from JSON definitions. Source text is never evaluated; a
//! string either names a registered function or uses the expression forms:
//!
//! - `const:<json>` always yields the JSON literal
//! - `field:<name>` yields the stored value of another field

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::instance::Instance;

/// Getter/setter: `(value, field name, instance) -> value`
pub type Accessor = Arc<dyn Fn(&Value, &str, &Instance) -> Value + Send + Sync>;

/// Validator: returns a message when the value is rejected
pub type ValidatorFn = Arc<dyn Fn(&Value) -> Option<String> + Send + Sync>;

/// Event payload transformer
pub type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Registry of named functions available to definitions
#[derive(Default)]
pub struct FunctionRegistry {
    accessors: RwLock<HashMap<String, Accessor>>,
    validators: RwLock<HashMap<String, ValidatorFn>>,
    transformers: RwLock<HashMap<String, TransformFn>>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut accessors: Vec<String> = self.accessors.read().keys().cloned().collect();
        accessors.sort();
        let mut validators: Vec<String> = self.validators.read().keys().cloned().collect();
        validators.sort();
        f.debug_struct("FunctionRegistry")
            .field("accessors", &accessors)
            .field("validators", &validators)
            .field("transformers", &self.transformers.read().len())
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a getter/setter under a name
    pub fn register_accessor<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value, &str, &Instance) -> Value + Send + Sync + 'static,
    {
        self.accessors.write().insert(name.into(), Arc::new(f));
    }

    pub fn register_validator<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.validators.write().insert(name.into(), Arc::new(f));
    }

    pub fn register_transformer<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transformers.write().insert(name.into(), Arc::new(f));
    }

    /// Resolve an accessor expression or registered name
    pub fn resolve_accessor(&self, expr: &str) -> Result<Accessor, String> {
        if let Some(literal) = expr.strip_prefix("const:") {
            let value: Value = serde_json::from_str(literal)
                .map_err(|e| format!("invalid constant \"{}\": {}", literal, e))?;
            return Ok(Arc::new(move |_, _, _| value.clone()));
        }

        if let Some(field) = expr.strip_prefix("field:") {
            let field = field.trim().to_string();
            if field.is_empty() {
                return Err("field expression requires a field name".to_string());
            }
            return Ok(Arc::new(move |_, _, instance| {
                instance.raw_value(&field).unwrap_or(Value::Null)
            }));
        }

        self.accessors
            .read()
            .get(expr)
            .cloned()
            .ok_or_else(|| format!("unknown function \"{}\"", expr))
    }

    pub fn resolve_validator(&self, name: &str) -> Result<ValidatorFn, String> {
        self.validators
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| format!("unknown validator \"{}\"", name))
    }

    /// Transformers are optional at call sites, so lookup does not fail
    pub fn transformer(&self, name: &str) -> Option<TransformFn> {
        self.transformers.read().get(name).cloned()
    }
}
