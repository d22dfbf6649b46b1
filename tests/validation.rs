//! Field and Model Validation Tests
//!
//! Covers:
//! - Pattern, function and registered validators
//! - Length constraints
//! - Combined multi-field failures
//! - Whole-model validators
//! - Required / optional resolution and atomic rejection

mod common;

use serde_json::{json, Value};

use aeromodel::{FieldDef, FieldType, Model, ModelDefinition, ModelError, ModelRegistry};

use common::object;

fn digit_model(registry: &ModelRegistry) -> Model {
    registry
        .define(
            "user",
            ModelDefinition::new()
                .field("age", FieldDef::of(FieldType::Number).pattern("/^[0-9]$/"))
                .field("height", FieldDef::of(FieldType::Number).pattern("/^[0-9]$/"))
                .connector_named("memory"),
        )
        .unwrap()
}

#[test]
fn test_pattern_validator() {
    let registry = ModelRegistry::new();
    let user = digit_model(&registry);
    let created = user.create(json!({"age": 9})).unwrap();
    assert_eq!(created.get("age"), Some(json!(9)));

    let err = created.set("age", json!(12)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "field \"age\" failed validation using expression \"/^[0-9]$/\" and value: 12"
    );
    assert_eq!(created.get("age"), Some(json!(9)));
}

#[test]
fn test_combined_validation_errors() {
    let registry = ModelRegistry::new();
    let user = digit_model(&registry);
    let created = user.create(json!({"age": 9, "height": 9})).unwrap();

    let err = created
        .set_many(object(json!({"height": 12, "age": 12})), false)
        .unwrap_err();
    assert_eq!(err.field().as_deref(), Some("age, height"));
    assert_eq!(
        err.to_string(),
        "field \"age\" failed validation using expression \"/^[0-9]$/\" and value: 12\n\
         field \"height\" failed validation using expression \"/^[0-9]$/\" and value: 12"
    );

    // Nothing from a rejected batch is written
    assert_eq!(created.values(false), object(json!({"age": 9, "height": 9})));
    assert!(created.changed_fields().is_empty());
}

#[test]
fn test_partial_batch_is_atomic() {
    let registry = ModelRegistry::new();
    let user = digit_model(&registry);
    let created = user.create(json!({"age": 1, "height": 1})).unwrap();
    assert!(created
        .set_many(object(json!({"age": 2, "height": 20})), false)
        .is_err());
    assert_eq!(created.get("age"), Some(json!(1)));
}

#[test]
fn test_model_validator() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("age", FieldDef::of(FieldType::Number))
                .field("height", FieldDef::of(FieldType::Number))
                .validator(|values: &Value| {
                    let mut errors = Vec::new();
                    if values["age"].as_i64().unwrap_or(0) > 9 {
                        errors.push("Age must be less than 10.");
                    }
                    if values["height"].as_i64().unwrap_or(0) > 9 {
                        errors.push("Height must be less than 10.");
                    }
                    (!errors.is_empty()).then(|| errors.join("\n"))
                })
                .connector_named("memory"),
        )
        .unwrap();

    let created = user.create(json!({"age": 9, "height": 9})).unwrap();
    let err = created
        .set_many(object(json!({"age": 12, "height": 12})), false)
        .unwrap_err();
    assert_eq!(err.field().as_deref(), Some("user"));
    assert_eq!(err.to_string(), "Age must be less than 10.\nHeight must be less than 10.");
    assert_eq!(created.get("age"), Some(json!(9)));
}

#[test]
fn test_function_validator() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field(
                    "age",
                    FieldDef::of(FieldType::Number)
                        .validator(|v| (v != &json!(9)).then(|| "Number must be 9".to_string())),
                )
                .connector_named("memory"),
        )
        .unwrap();
    let created = user.create(json!({"age": 9})).unwrap();
    let err = created.set("age", json!(12)).unwrap_err();
    assert_eq!(err.to_string(), "Number must be 9");
    assert_eq!(err.code(), "MODEL_VALIDATION_FAILED");
}

#[test]
fn test_registered_validator_by_name() {
    let registry = ModelRegistry::new();
    registry.functions().register_validator("positive", |v: &Value| {
        (v.as_f64().unwrap_or(0.0) <= 0.0).then(|| "must be positive".to_string())
    });
    let model = registry
        .define_json(
            "account",
            &json!({"fields": {"balance": {"type": "number", "validator": "positive"}}}),
        )
        .unwrap();
    assert!(model.instance(json!({"balance": 5}), false).is_ok());
    assert_eq!(
        model.instance(json!({"balance": -1}), false).unwrap_err().to_string(),
        "must be positive"
    );

    let err = registry
        .define_json("broken", &json!({"fields": {"a": {"validator": "nope"}}}))
        .unwrap_err();
    assert_eq!(err.code(), "MODEL_INVALID_FIELD");
}

#[test]
fn test_validators_skip_absent_values() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String).pattern("/^[a-z]+$/"))
                .field("age", FieldDef::of(FieldType::Number).required(false).pattern("/^[0-9]+$/"))
                .connector_named("memory"),
        )
        .unwrap();
    assert!(user.create(json!({})).is_ok());
    assert!(user.create(json!({"name": "jeff"})).is_ok());
}

#[test]
fn test_boolean_false_is_validated() {
    let registry = ModelRegistry::new();
    let model = registry
        .define(
            "flags",
            ModelDefinition::new().field("on", FieldDef::of(FieldType::Boolean).pattern("/^true$/")),
        )
        .unwrap();
    assert!(model.instance(json!({"on": false}), false).is_err());
    assert!(model.instance(json!({"on": true}), false).is_ok());
}

#[test]
fn test_length_constraints() {
    let registry = ModelRegistry::new();
    let define = |name: &str, def: FieldDef| {
        registry
            .define(name, ModelDefinition::new().field("name", def).connector_named("memory"))
            .unwrap()
    };
    let min_and_max = define("minmax", FieldDef::of(FieldType::String).min_length(4).max_length(8));
    let min = define("min", FieldDef::of(FieldType::String).min_length(4));
    let max = define("max", FieldDef::of(FieldType::String).max_length(8));
    let exact = define("exact", FieldDef::of(FieldType::String).length(8));

    let fails = |model: &Model, name: &str, message: &str| {
        let err = model.create(json!({"name": name})).unwrap_err();
        assert_eq!(err.to_string(), message);
    };
    let passes = |model: &Model, data: Value| {
        assert!(model.create(data).is_ok());
    };

    passes(&min_and_max, json!({}));
    fails(&min_and_max, "", "field value must be at least 4 characters long: name");
    fails(&min_and_max, "12", "field value must be at least 4 characters long: name");
    passes(&min_and_max, json!({"name": "1234"}));
    passes(&min_and_max, json!({"name": "12345678"}));
    fails(&min_and_max, "123456789", "field value must be at most 8 characters long: name");

    passes(&min, json!({}));
    fails(&min, "12", "field value must be at least 4 characters long: name");
    passes(&min, json!({"name": "1234567890"}));

    passes(&exact, json!({}));
    fails(&exact, "", "field value must be exactly 8 characters long: name");
    fails(&exact, "123456789", "field value must be exactly 8 characters long: name");
    passes(&exact, json!({"name": "12345678"}));

    passes(&max, json!({"name": ""}));
    fails(&max, "123456789", "field value must be at most 8 characters long: name");
}

#[test]
fn test_required_field_missing() {
    let registry = ModelRegistry::new();
    let user = common::define_user(&registry);
    let err = user.create(json!({"name": "jeff"})).unwrap_err();
    assert!(matches!(&err, ModelError::RequiredField(f) if f == "age"));
    assert_eq!(err.to_string(), "required field value missing: age");

    let err = user.create(json!({"name": "jeff", "age": null})).unwrap_err();
    assert_eq!(err.code(), "MODEL_REQUIRED_FIELD");
}

#[test]
fn test_optional_field_may_be_absent() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String).required(true))
                .field("email", FieldDef::of(FieldType::String).optional(true))
                .connector_named("memory"),
        )
        .unwrap();
    let created = user.create(json!({"name": "jeff"})).unwrap();
    assert_eq!(created.get("email"), None);
}

#[test]
fn test_optionality_from_json() {
    let registry = ModelRegistry::new();
    let model = registry
        .define_json(
            "user",
            &json!({"fields": {
                "a1": {},
                "a2": {"required": true},
                "a3": {"optional": false},
                "a4": {"optional": true},
                "a5": {"required": true, "optional": true},
                "a6": {"required": false, "optional": true}
            }}),
        )
        .unwrap();
    let required: Vec<bool> = model.fields().iter().map(|f| f.is_required()).collect();
    assert_eq!(required, vec![false, true, true, false, true, false]);
    assert!(model.fields().iter().all(|f| f.is_required() != f.is_optional()));
}

#[test]
fn test_required_checked_on_save() {
    let registry = ModelRegistry::new();
    let user = common::define_user(&registry);
    let created = user.create(json!({"name": "jeff", "age": 3})).unwrap();
    created.set("age", Value::Null).unwrap();
    assert!(matches!(created.save(), Err(ModelError::RequiredField(_))));
}
