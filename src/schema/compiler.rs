//! Field compilation
//!
//! Turns a raw [`FieldDef`] into an immutable [`FieldSpec`]:
//! - `id` is reserved for the generated primary key
//! - type names are matched case-insensitively and normalized
//! - `required` / `optional` are resolved so that `required == !optional`
//! - named getters, setters and validators are resolved through the function registry
//! - pattern validators are compiled once

use std::fmt;

use serde_json::{json, Map, Value};

use super::coerce::coerce;
use super::field::{DefaultValue, FieldDef, FieldFn, ValidatorDef};
use super::functions::{Accessor, FunctionRegistry};
use super::types::FieldType;
use super::validator::{LengthConstraints, Validator};
use crate::errors::{ModelError, ModelResult};

/// Name reserved for the generated primary key
pub const RESERVED_PRIMARY_KEY: &str = "id";

/// Compiled, immutable field
#[derive(Clone)]
pub struct FieldSpec {
    name: String,
    storage_name: String,
    field_type: Option<FieldType>,
    required: bool,
    optional: bool,
    default: Option<DefaultValue>,
    read_only: bool,
    custom: bool,
    getter: Option<Accessor>,
    setter: Option<Accessor>,
    validator: Option<Validator>,
    length: LengthConstraints,
    child_model: Option<String>,
    description: Option<String>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("storage_name", &self.storage_name)
            .field("type", &self.field_type)
            .field("required", &self.required)
            .field("read_only", &self.read_only)
            .field("custom", &self.custom)
            .field("validator", &self.validator)
            .finish()
    }
}

/// Resolve the `required` / `optional` pair.
///
/// Neither given: optional. One given: it determines the other.
/// Both given: required wins unless the pair is exactly
/// `required: false, optional: true`.
pub fn resolve_optionality(required: Option<bool>, optional: Option<bool>) -> (bool, bool) {
    let required = match (required, optional) {
        (Some(r), Some(o)) => r || !o,
        (Some(r), None) => r,
        (None, Some(o)) => !o,
        (None, None) => false,
    };
    (required, !required)
}

/// Compile one field declaration
pub fn compile_field(name: &str, def: &FieldDef, functions: &FunctionRegistry) -> ModelResult<FieldSpec> {
    if name == RESERVED_PRIMARY_KEY {
        return Err(ModelError::invalid_field(
            name,
            "id is a reserved field name for the generated primary key",
        ));
    }

    let mut field_type = match &def.type_name {
        Some(type_name) => Some(FieldType::parse(type_name).ok_or_else(|| {
            ModelError::invalid_field(
                name,
                format!("unrecognized type \"{}\" for field \"{}\"", type_name, name),
            )
        })?),
        None => None,
    };

    if def.child_model.is_some() {
        match field_type {
            None => field_type = Some(FieldType::Object),
            Some(t) if !t.is_structural() => {
                return Err(ModelError::invalid_field(
                    name,
                    format!("field \"{}\" of type {} cannot hold a child model", name, t),
                ))
            }
            Some(_) => {}
        }
    }

    let (required, optional) = resolve_optionality(def.required, def.optional);

    let getter = resolve_fn(name, def.getter.as_ref(), functions)?;
    let setter = resolve_fn(name, def.setter.as_ref(), functions)?;

    let validator = match &def.validator {
        None => None,
        Some(ValidatorDef::Pattern(p)) => Some(Validator::pattern(p).map_err(|e| {
            ModelError::invalid_field(
                name,
                format!("invalid validator expression for field \"{}\": {}", name, e),
            )
        })?),
        Some(ValidatorDef::Function(f)) => Some(Validator::Function(f.clone())),
        Some(ValidatorDef::Named(n)) => Some(Validator::Function(
            functions
                .resolve_validator(n)
                .map_err(|e| ModelError::invalid_field(name, e))?,
        )),
    };

    Ok(FieldSpec {
        name: name.to_string(),
        storage_name: def.storage_name.clone().unwrap_or_else(|| name.to_string()),
        field_type,
        required,
        optional,
        default: def.default.clone(),
        read_only: def.read_only,
        custom: def.custom,
        getter,
        setter,
        validator,
        length: LengthConstraints {
            exact: def.length,
            min: def.min_length,
            max: def.max_length,
        },
        child_model: def.child_model.clone(),
        description: def.description.clone(),
    })
}

fn resolve_fn(name: &str, f: Option<&FieldFn>, functions: &FunctionRegistry) -> ModelResult<Option<Accessor>> {
    match f {
        None => Ok(None),
        Some(FieldFn::Function(f)) => Ok(Some(f.clone())),
        Some(FieldFn::Named(expr)) => functions
            .resolve_accessor(expr)
            .map(Some)
            .map_err(|e| ModelError::invalid_field(name, format!("field \"{}\": {}", name, e))),
    }
}

impl FieldSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key used in storage payloads
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn getter(&self) -> Option<&Accessor> {
        self.getter.as_ref()
    }

    pub fn setter(&self) -> Option<&Accessor> {
        self.setter.as_ref()
    }

    pub fn child_model(&self) -> Option<&str> {
        self.child_model.as_deref()
    }

    pub fn default_value(&self) -> Option<Value> {
        self.default.as_ref().map(DefaultValue::produce)
    }

    pub fn has_validation(&self) -> bool {
        self.validator.is_some() || !self.length.is_empty()
    }

    /// Coerce a value to this field's type
    pub fn coerce(&self, value: Value) -> Value {
        coerce(self.field_type, value)
    }

    /// Run length constraints then the validator against a present value
    pub fn check(&self, value: &Value) -> Option<String> {
        if value.is_null() {
            return None;
        }
        if let Some(message) = self.length.check(&self.name, value) {
            return Some(message);
        }
        self.validator
            .as_ref()
            .and_then(|v| v.check(&self.name, value))
    }

    /// Describe the compiled field
    pub fn describe(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("name".into(), json!(self.storage_name));
        if let Some(t) = self.field_type {
            obj.insert("type".into(), json!(t.type_name()));
        }
        obj.insert("required".into(), json!(self.required));
        obj.insert("optional".into(), json!(self.optional));
        if self.read_only {
            obj.insert("readonly".into(), json!(true));
        }
        if self.custom {
            obj.insert("custom".into(), json!(true));
        }
        if let Some(DefaultValue::Value(v)) = &self.default {
            obj.insert("default".into(), v.clone());
        }
        if let Some(source) = self.validator.as_ref().and_then(Validator::source) {
            obj.insert("validator".into(), json!(source));
        }
        if let Some(n) = self.length.min {
            obj.insert("minlength".into(), json!(n));
        }
        if let Some(n) = self.length.max {
            obj.insert("maxlength".into(), json!(n));
        }
        if let Some(n) = self.length.exact {
            obj.insert("length".into(), json!(n));
        }
        if let Some(model) = &self.child_model {
            obj.insert("model".into(), json!(model));
        }
        if let Some(text) = &self.description {
            obj.insert("description".into(), json!(text));
        }
        Value::Object(obj)
    }
}
