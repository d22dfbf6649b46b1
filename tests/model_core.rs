//! Model Definition and Instance Lifecycle Tests
//!
//! Covers:
//! - Definition compilation (reserved names, model names, optionality)
//! - Registry lookup, extend and reduce
//! - Instance values, change tracking and primary-key aliases
//! - Create / find / save / delete round trips on the memory connector

mod common;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use aeromodel::connector::MemoryConnector;
use aeromodel::events::InstanceEvent;
use aeromodel::{
    FieldDef, FieldType, InstanceStatus, ModelDefinition, ModelError, ModelRegistry, PrimaryKeyAlias,
};

use common::{define_user, object};

// =============================================================================
// Definition Tests
// =============================================================================

#[test]
fn test_missing_definition_rejected() {
    let registry = ModelRegistry::new();
    let err = registry.define_json("user", &Value::Null).unwrap_err();
    assert_eq!(err.to_string(), "missing required definition");
}

#[test]
fn test_id_field_reserved() {
    let registry = ModelRegistry::new();
    let err = registry
        .define("user", ModelDefinition::new().field("id", FieldDef::of(FieldType::String)))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "id is a reserved field name for the generated primary key"
    );
}

#[test]
fn test_model_name_rules() {
    let registry = ModelRegistry::new();
    let err = registry.define("bad name", ModelDefinition::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Model names cannot contain characters that need to be encoded in a URL: \"bad name\""
    );

    let err = registry.define("user.cry", ModelDefinition::new()).unwrap_err();
    assert_eq!(err.to_string(), "Model names cannot contain periods: \"user.cry\"");

    assert!(registry.define("user_cry-1", ModelDefinition::new()).is_ok());
}

#[test]
fn test_registry_lookup_and_replace() {
    let registry = ModelRegistry::new();
    let first = define_user(&registry);
    assert!(registry.get("user").unwrap().ptr_eq(&first));
    assert_eq!(registry.model_names(), vec!["user"]);

    let second = registry.define("user", ModelDefinition::new()).unwrap();
    assert!(registry.get("user").unwrap().ptr_eq(&second));
    assert_eq!(registry.models().len(), 1);

    registry.clear();
    assert!(registry.get("user").is_none());
}

#[test]
fn test_case_insensitive_types_from_json() {
    let registry = ModelRegistry::new();
    let model = registry
        .define_json(
            "user",
            &json!({"fields": {"name": {"type": "STRING"}, "age": {"type": "Number"}}}),
        )
        .unwrap();
    assert_eq!(model.field("name").unwrap().field_type(), Some(FieldType::String));
    assert_eq!(model.field("age").unwrap().field_type(), Some(FieldType::Number));
    assert!(registry.define_json("user", &json!({"fields": {"a": {"type": "widget"}}})).is_err());
}

#[test]
fn test_model_keys_and_payload_keys() {
    let registry = ModelRegistry::new();
    let model = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String).named("thename"))
                .field("age", FieldDef::of(FieldType::Number)),
        )
        .unwrap();
    assert_eq!(model.keys(), vec!["name", "age"]);
    assert_eq!(model.payload_keys(), vec!["thename", "age"]);
    assert_eq!(
        model.translate_keys_for_payload(&object(json!({"name": "a", "other": 1}))),
        object(json!({"thename": "a", "other": 1}))
    );
}

#[test]
fn test_model_without_connector() {
    let registry = ModelRegistry::new();
    let model = registry
        .define("user", ModelDefinition::new().field("name", FieldDef::of(FieldType::String)))
        .unwrap();
    assert!(model.connector().is_none());
    assert!(model.operations().is_empty());
    assert!(matches!(model.create(json!({"name": "a"})), Err(ModelError::MissingConnector)));
    assert!(matches!(model.find_all(), Err(ModelError::MissingConnector)));

    // Instances still work without persistence
    let instance = model.instance(json!({"name": "a"}), false).unwrap();
    assert_eq!(instance.get("name"), Some(json!("a")));
}

// =============================================================================
// Extend / Reduce Tests
// =============================================================================

#[test]
fn test_extend_unions_fields_and_inherits_connector() {
    let registry = ModelRegistry::new();
    let connector = Arc::new(MemoryConnector::new());
    let user = registry
        .define(
            "User",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String))
                .connector(connector.clone()),
        )
        .unwrap();

    let aged = user
        .extend("AgeUser", ModelDefinition::new().field("age", FieldDef::of(FieldType::Number)))
        .unwrap();
    assert_eq!(aged.keys(), vec!["name", "age"]);
    assert!(registry.get("AgeUser").is_some());

    aged.create(json!({"name": "a", "age": 3})).unwrap();
    assert_eq!(connector.len(&aged), 1);
}

#[test]
fn test_extend_renames_by_storage_alias() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "User",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String))
                .connector_named("memory"),
        )
        .unwrap();

    let renamed = user
        .extend(
            "RenamedAgeUser",
            json!({"fields": {"NewName": {"type": "string", "name": "name"}, "NewAge": {"type": "number"}}}),
        )
        .unwrap();
    assert!(renamed.field("NewName").is_some());
    assert!(renamed.field("NewAge").is_some());
    assert!(renamed.field("name").is_none());

    let created = renamed.create(json!({"name": "jeff"})).unwrap();
    assert_eq!(
        serde_json::to_string(&created.to_json()).unwrap(),
        format!("{{\"id\":{},\"NewName\":\"jeff\"}}", created.id().unwrap())
    );

    let loaded = renamed.instance(json!({"name": "jeff"}), true).unwrap();
    loaded.set_primary_key(json!(1));
    assert_eq!(loaded.to_json(), json!({"id": 1, "NewName": "jeff"}));
}

#[test]
fn test_extend_with_another_model() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let birthday = registry
        .define(
            "BirthdayUser",
            ModelDefinition::new().field("birthdate", FieldDef::of(FieldType::Date)),
        )
        .unwrap();
    let combined = user.extend("BirthdayAgeUser", birthday).unwrap();
    assert_eq!(combined.keys(), vec!["name", "age", "birthdate"]);
}

#[test]
fn test_extend_with_non_object_rejected() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let err = user.extend("Broken", json!("nope")).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid argument passed to extend. Must either be a model class or model definition"
    );
}

#[test]
fn test_reduce_keeps_only_named_fields() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let reduced = user
        .reduce("ReducedUser", ModelDefinition::new().field("age", FieldDef::of(FieldType::Number)))
        .unwrap();
    assert_eq!(reduced.keys(), vec!["age"]);
    assert_eq!(reduced.connector().unwrap().name(), "memory");
}

// =============================================================================
// Instance Tests
// =============================================================================

#[test]
fn test_instance_values_and_changes() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.instance(json!({"name": "jeff", "age": 25}), true).unwrap();

    assert!(instance.values(true).is_empty());
    assert_eq!(instance.values(false), object(json!({"name": "jeff", "age": 25})));
    assert!(!instance.is_unsaved());

    instance.set("age", json!(26)).unwrap();
    assert_eq!(instance.changed_fields(), vec!["age"]);
    assert_eq!(instance.values(true), object(json!({"age": 26})));
    assert!(instance.is_unsaved());
}

#[test]
fn test_set_same_value_is_not_a_change() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.instance(json!({"name": "jeff", "age": 25}), true).unwrap();
    instance.set("age", json!(25)).unwrap();
    assert!(instance.changed_fields().is_empty());
    assert!(!instance.is_unsaved());

    instance.change("age", json!(25)).unwrap();
    assert!(instance.is_unsaved());
}

#[test]
fn test_change_event_published() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.instance(json!({"name": "jeff", "age": 25}), true).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    instance.events().subscribe(move |event: &InstanceEvent| {
        sink.lock().push(event.clone());
    });

    instance.set("name", json!("nolan")).unwrap();
    assert_eq!(
        *seen.lock(),
        vec![InstanceEvent::Change {
            field: "name".into(),
            value: json!("nolan"),
            previous: Some(json!("jeff")),
        }]
    );
    assert_eq!(seen.lock()[0].name(), "change:name");
}

#[test]
fn test_get_unknown_field_is_none() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.instance(json!({"name": "jeff", "age": 25}), true).unwrap();
    assert_eq!(instance.get("nope"), None);
}

#[test]
fn test_primary_key_aliases() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.create(json!({"name": "jeff", "age": 25})).unwrap();
    let pk = instance.primary_key().unwrap();

    for alias in PrimaryKeyAlias::ALL {
        assert_eq!(instance.get(alias.as_str()), Some(pk.clone()));
        assert_eq!(instance.alias(alias), Some(pk.clone()));
    }
    assert_eq!(instance.id(), Some(pk));

    instance.set_alias(PrimaryKeyAlias::Underscore, json!(42));
    assert_eq!(instance.get("ID"), Some(json!(42)));
}

#[test]
fn test_create_with_defaults() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String).default_value(json!("jeff")))
                .field("age", FieldDef::of(FieldType::Number).default_with(|| json!(10)))
                .connector_named("memory"),
        )
        .unwrap();
    let created = user.create(json!({})).unwrap();
    assert_eq!(created.get("name"), Some(json!("jeff")));
    assert_eq!(created.get("age"), Some(json!(10)));
}

#[test]
fn test_unknown_field_on_create() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let err = user
        .create(json!({"name": "jeff", "age": 1, "foo": "bar"}))
        .unwrap_err();
    assert_eq!(err.code(), "MODEL_INVALID_FIELD");

    // Stored records may carry keys the model no longer declares
    let loaded = user.instance(json!({"name": "jeff", "foo": "bar"}), true).unwrap();
    assert_eq!(loaded.values(false), object(json!({"name": "jeff"})));
}

#[test]
fn test_instance_rejects_non_object_data() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let err = user.instance(json!("hello"), false).unwrap_err();
    assert_eq!(err.code(), "MODEL_INVALID_ARGUMENT");
}

#[test]
fn test_read_only_fields() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String))
                .field("email", FieldDef::of(FieldType::String).read_only()),
        )
        .unwrap();
    let instance = user
        .instance(json!({"name": "bar", "email": "test@example.com"}), true)
        .unwrap();
    assert!(instance.values(true).is_empty());

    instance.set("name", json!("foo")).unwrap();
    let err = instance.set("email", json!("what@example.com")).unwrap_err();
    assert_eq!(err.to_string(), "cannot set read-only field: email");

    instance.force_set("email", json!("hello@example.com")).unwrap();
    assert_eq!(
        instance.values(true),
        object(json!({"name": "foo", "email": "hello@example.com"}))
    );
}

#[test]
fn test_coercion() {
    let registry = ModelRegistry::new();
    let model = registry
        .define(
            "thing",
            ModelDefinition::new()
                .field("count", FieldDef::of(FieldType::Number))
                .field("flag", FieldDef::of(FieldType::Boolean))
                .field("extra", FieldDef::of(FieldType::Object).default_value(json!(""))),
        )
        .unwrap();
    let instance = model
        .instance(json!({"count": "10", "flag": "false"}), false)
        .unwrap();
    assert_eq!(instance.get("count"), Some(json!(10)));
    assert_eq!(instance.get("flag"), Some(json!(false)));
    assert_eq!(instance.get("extra"), Some(json!({})));

    instance.set("flag", json!(1)).unwrap();
    assert_eq!(instance.get("flag"), Some(json!(true)));
}

#[test]
fn test_custom_methods() {
    let registry = ModelRegistry::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String))
                .method("greet", |instance, args| {
                    let name = instance.get("name").unwrap_or(Value::Null);
                    Ok(json!(format!("{} {}", args[0].as_str().unwrap_or(""), name.as_str().unwrap_or(""))))
                }),
        )
        .unwrap();
    let instance = user.instance(json!({"name": "jeff"}), false).unwrap();
    assert_eq!(instance.call("greet", &[json!("hello")]).unwrap(), json!("hello jeff"));
    assert!(instance.call("missing", &[]).is_err());
    assert_eq!(user.method_names(), vec!["greet"]);
}

#[test]
fn test_instance_knows_its_model() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.instance(json!({"name": "a", "age": 1}), false).unwrap();
    assert!(instance.model().ptr_eq(&user));
}

// =============================================================================
// CRUD Tests
// =============================================================================

#[test]
fn test_crud_round_trip() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);

    let created = user.create(json!({"name": "jeff", "age": 25})).unwrap();
    assert_eq!(created.status(), InstanceStatus::Saved);
    let id = created.id().unwrap();

    let found = user.find_by_id(&id).unwrap().unwrap();
    assert_eq!(found.get("name"), Some(json!("jeff")));

    found.set("age", json!(26)).unwrap();
    assert_eq!(found.status(), InstanceStatus::Unsaved);
    found.save().unwrap();
    assert_eq!(found.status(), InstanceStatus::Saved);
    assert!(found.changed_fields().is_empty());
    assert_eq!(user.find_by_id(&id).unwrap().unwrap().get("age"), Some(json!(26)));

    assert_eq!(user.find_all().unwrap().len(), 1);

    found.delete().unwrap();
    assert_eq!(found.status(), InstanceStatus::Deleted);
    assert!(user.find_by_id(&id).unwrap().is_none());
    assert!(user.find_all().unwrap().is_empty());
}

#[test]
fn test_save_new_instance_creates() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let instance = user.instance(json!({"name": "jeff", "age": 25}), false).unwrap();
    assert_eq!(instance.status(), InstanceStatus::New);

    let saved = instance.save().unwrap();
    assert!(saved.ptr_eq(&instance));
    assert_eq!(instance.id(), Some(json!(1)));
    assert_eq!(instance.status(), InstanceStatus::Saved);
}

#[test]
fn test_save_after_delete_fails() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let created = user.create(json!({"name": "jeff", "age": 25})).unwrap();
    created.delete().unwrap();

    created.set("age", json!(1)).unwrap();
    assert!(matches!(created.save(), Err(ModelError::AlreadyDeleted)));
    let err = created.delete().unwrap_err();
    assert_eq!(err.to_string(), "instance has already been deleted");
}

#[test]
fn test_save_clean_instance_is_noop() {
    let registry = ModelRegistry::new();
    let connector = common::CountingConnector::new();
    let user = registry
        .define(
            "user",
            ModelDefinition::new()
                .field("name", FieldDef::of(FieldType::String))
                .connector(connector.clone()),
        )
        .unwrap();
    let created = user.create(json!({"name": "jeff"})).unwrap();
    created.save().unwrap();
    created.save().unwrap();
    assert_eq!(connector.calls(aeromodel::Operation::Update), 0);
}

#[test]
fn test_setting_id_then_saving_updates() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let created = user.create(json!({"name": "jeff", "age": 25})).unwrap();

    let copy = user.instance(json!({"name": "jeff", "age": 30}), false).unwrap();
    copy.set_id(created.id().unwrap());
    copy.save().unwrap();
    assert_eq!(user.find_all().unwrap().len(), 1);
    assert_eq!(user.find_by_id(&json!(1)).unwrap().unwrap().get("age"), Some(json!(30)));
}

#[test]
fn test_reset_primary_keys() {
    let registry = ModelRegistry::empty();
    let connector = Arc::new(MemoryConnector::new());
    registry.register_connector(connector.clone());
    let user = define_user(&registry);

    assert_eq!(user.create(json!({"name": "a", "age": 1})).unwrap().id(), Some(json!(1)));
    assert_eq!(user.create(json!({"name": "b", "age": 1})).unwrap().id(), Some(json!(2)));
    user.delete_all().unwrap();
    connector.reset_primary_keys();
    assert_eq!(user.create(json!({"name": "c", "age": 1})).unwrap().id(), Some(json!(1)));
}

#[test]
fn test_batch_create_reports_failures_in_place() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    let results = user
        .create_many(vec![
            json!({"name": "a", "age": 1}),
            json!({"age": 2}),
            json!({"name": "c", "age": 3}),
        ])
        .unwrap();
    assert!(results[0].is_some());
    assert!(results[1].is_none());
    assert_eq!(results[2].as_ref().unwrap().id(), Some(json!(2)));

    let found = user.find_by_ids(&[json!(2), json!(99), json!(1)]).unwrap();
    assert_eq!(found.iter().map(Option::is_some).collect::<Vec<_>>(), vec![true, false, true]);
}

#[test]
fn test_update_by_id_and_upsert() {
    let registry = ModelRegistry::new();
    let user = define_user(&registry);
    user.create(json!({"name": "jeff", "age": 25})).unwrap();

    let updated = user.update_by_id(&json!(1), object(json!({"age": 40}))).unwrap().unwrap();
    assert_eq!(updated.get("age"), Some(json!(40)));
    assert!(user.update_by_id(&json!(9), object(json!({"age": 1}))).unwrap().is_none());

    let stored = user.upsert(&json!(5), object(json!({"name": "new", "age": 2}))).unwrap();
    assert_eq!(stored.id(), Some(json!(5)));
    let stored = user.upsert(&json!(5), object(json!({"name": "newer", "age": 3}))).unwrap();
    assert_eq!(stored.get("name"), Some(json!("newer")));
    assert_eq!(user.find_all().unwrap().len(), 2);

    assert!(user.upsert(&json!(6), object(json!({"age": 3}))).is_err());
}
