//! Raw field declarations
//!
//! A `FieldDef` is what a caller writes; it is compiled into a
//! [`FieldSpec`](super::FieldSpec) when the owning model is defined.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::functions::{Accessor, ValidatorFn};
use super::types::FieldType;
use crate::errors::{ModelError, ModelResult};
use crate::instance::Instance;

/// Default value for a field: a literal or a zero-argument producer
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Producer(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Value(v) => write!(f, "Value({})", v),
            DefaultValue::Producer(_) => write!(f, "Producer(..)"),
        }
    }
}

/// Custom getter or setter, given directly or by registered name/expression
#[derive(Clone)]
pub enum FieldFn {
    Function(Accessor),
    Named(String),
}

impl fmt::Debug for FieldFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldFn::Function(_) => write!(f, "Function(..)"),
            FieldFn::Named(name) => write!(f, "Named({:?})", name),
        }
    }
}

/// Field validator declaration
#[derive(Clone)]
pub enum ValidatorDef {
    /// Regular expression, either bare or as `/body/flags`
    Pattern(String),
    /// Predicate returning a message on failure
    Function(ValidatorFn),
    /// Registered validator name
    Named(String),
}

impl fmt::Debug for ValidatorDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidatorDef::Pattern(p) => write!(f, "Pattern({:?})", p),
            ValidatorDef::Function(_) => write!(f, "Function(..)"),
            ValidatorDef::Named(name) => write!(f, "Named({:?})", name),
        }
    }
}

/// Uncompiled field declaration
#[derive(Debug, Clone, Default)]
pub struct FieldDef {
    pub(crate) storage_name: Option<String>,
    pub(crate) type_name: Option<String>,
    pub(crate) required: Option<bool>,
    pub(crate) optional: Option<bool>,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) read_only: bool,
    pub(crate) custom: bool,
    pub(crate) getter: Option<FieldFn>,
    pub(crate) setter: Option<FieldFn>,
    pub(crate) validator: Option<ValidatorDef>,
    pub(crate) min_length: Option<usize>,
    pub(crate) max_length: Option<usize>,
    pub(crate) length: Option<usize>,
    pub(crate) child_model: Option<String>,
    pub(crate) description: Option<String>,
}

impl FieldDef {
    /// Untyped field
    pub fn new() -> Self {
        Self::default()
    }

    /// Field of a known type
    pub fn of(field_type: FieldType) -> Self {
        Self {
            type_name: Some(field_type.type_name().to_string()),
            ..Self::default()
        }
    }

    /// Field whose type is given by name, matched case-insensitively at compile time
    pub fn type_named(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    /// Storage alias used in payloads
    pub fn named(mut self, storage_name: impl Into<String>) -> Self {
        self.storage_name = Some(storage_name.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = Some(optional);
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Value(value));
        self
    }

    pub fn default_with<F>(mut self, producer: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Producer(Arc::new(producer)));
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Computed field, excluded from storage payloads
    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &str, &Instance) -> Value + Send + Sync + 'static,
    {
        self.getter = Some(FieldFn::Function(Arc::new(f)));
        self
    }

    pub fn getter_named(mut self, expr: impl Into<String>) -> Self {
        self.getter = Some(FieldFn::Named(expr.into()));
        self
    }

    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &str, &Instance) -> Value + Send + Sync + 'static,
    {
        self.setter = Some(FieldFn::Function(Arc::new(f)));
        self
    }

    pub fn setter_named(mut self, expr: impl Into<String>) -> Self {
        self.setter = Some(FieldFn::Named(expr.into()));
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Option<String> + Send + Sync + 'static,
    {
        self.validator = Some(ValidatorDef::Function(Arc::new(f)));
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.validator = Some(ValidatorDef::Pattern(pattern.into()));
        self
    }

    pub fn validator_named(mut self, name: impl Into<String>) -> Self {
        self.validator = Some(ValidatorDef::Named(name.into()));
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn length(mut self, n: usize) -> Self {
        self.length = Some(n);
        self
    }

    /// Nested child model, referenced by registered name
    pub fn model(mut self, name: impl Into<String>) -> Self {
        self.child_model = Some(name.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Storage alias, when one was declared
    pub fn storage_name(&self) -> Option<&str> {
        self.storage_name.as_deref()
    }

    /// Parse a field declaration from its JSON form.
    ///
    /// Recognized keys: `type`, `name`, `required`, `optional`, `default`,
    /// `readonly`, `custom`, `validator`, `get`/`getter`, `set`/`setter`,
    /// `minlength`, `maxlength`, `length`, `model`, `description`.
    pub fn from_json(field: &str, value: &Value) -> ModelResult<FieldDef> {
        let obj = value
            .as_object()
            .ok_or_else(|| ModelError::invalid_field(field, format!("field \"{}\" must be an object", field)))?;

        let mut def = FieldDef::new();

        for (key, v) in obj {
            match key.to_ascii_lowercase().as_str() {
                "type" => def.type_name = Some(expect_str(field, key, v)?),
                "name" => def.storage_name = Some(expect_str(field, key, v)?),
                "required" => def.required = Some(expect_bool(field, key, v)?),
                "optional" => def.optional = Some(expect_bool(field, key, v)?),
                "default" => def.default = Some(DefaultValue::Value(v.clone())),
                "readonly" => def.read_only = expect_bool(field, key, v)?,
                "custom" => def.custom = expect_bool(field, key, v)?,
                "validator" => {
                    let s = expect_str(field, key, v)?;
                    def.validator = Some(if s.starts_with('/') {
                        ValidatorDef::Pattern(s)
                    } else {
                        ValidatorDef::Named(s)
                    });
                }
                "get" | "getter" => def.getter = Some(FieldFn::Named(expect_str(field, key, v)?)),
                "set" | "setter" => def.setter = Some(FieldFn::Named(expect_str(field, key, v)?)),
                "minlength" => def.min_length = Some(expect_usize(field, key, v)?),
                "maxlength" => def.max_length = Some(expect_usize(field, key, v)?),
                "length" => def.length = Some(expect_usize(field, key, v)?),
                "model" => def.child_model = Some(expect_str(field, key, v)?),
                "description" => def.description = Some(expect_str(field, key, v)?),
                _ => {}
            }
        }

        Ok(def)
    }
}

fn expect_str(field: &str, key: &str, v: &Value) -> ModelResult<String> {
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| ModelError::invalid_field(field, format!("\"{}\" of field \"{}\" must be a string", key, field)))
}

fn expect_bool(field: &str, key: &str, v: &Value) -> ModelResult<bool> {
    v.as_bool()
        .ok_or_else(|| ModelError::invalid_field(field, format!("\"{}\" of field \"{}\" must be a boolean", key, field)))
}

fn expect_usize(field: &str, key: &str, v: &Value) -> ModelResult<usize> {
    v.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| {
            ModelError::invalid_field(field, format!("\"{}\" of field \"{}\" must be a non-negative integer", key, field))
        })
}
