//! Property tests for optionality, pagination and query evaluation

use proptest::prelude::*;
use serde_json::json;

use aeromodel::planner::Predicate;
use aeromodel::schema::resolve_optionality;
use aeromodel::{FieldDef, FieldType, Model, ModelDefinition, ModelRegistry, QueryDescription};

fn arb_flag() -> impl Strategy<Value = Option<bool>> {
    prop_oneof![Just(None), Just(Some(true)), Just(Some(false))]
}

fn numbers(registry: &ModelRegistry, values: &[i64]) -> Model {
    let model = registry
        .define(
            "n",
            ModelDefinition::new()
                .field("v", FieldDef::of(FieldType::Number))
                .connector_named("memory"),
        )
        .unwrap();
    for v in values {
        model.create(json!({ "v": v })).unwrap();
    }
    model
}

fn ids(model: &Model, query: &QueryDescription) -> Vec<serde_json::Value> {
    model
        .query(query)
        .unwrap()
        .iter()
        .map(|i| i.id().unwrap())
        .collect()
}

proptest! {
    #[test]
    fn optionality_is_exclusive(required in arb_flag(), optional in arb_flag()) {
        let (req, opt) = resolve_optionality(required, optional);
        prop_assert_ne!(req, opt);
        if required == Some(true) {
            prop_assert!(req);
        }
        if required.is_none() && optional.is_none() {
            prop_assert!(opt);
        }
    }

    #[test]
    fn page_matches_skip_and_limit(
        values in prop::collection::vec(-50i64..50, 0..20),
        page in 1usize..6,
        per_page in 1usize..6,
    ) {
        let registry = ModelRegistry::new();
        let model = numbers(&registry, &values);

        let paged = ids(&model, &QueryDescription::new().page(page, per_page));
        let explicit = ids(&model, &QueryDescription::new().skip((page - 1) * per_page).limit(per_page));
        prop_assert_eq!(&paged, &explicit);
        prop_assert!(paged.len() <= per_page);
    }

    #[test]
    fn string_operands_match_like_numbers(
        values in prop::collection::vec(-20i64..20, 1..15),
        bound in -20i64..20,
    ) {
        let registry = ModelRegistry::new();
        let model = numbers(&registry, &values);

        let numeric = QueryDescription::new().filter(Predicate::gte("v", json!(bound)));
        let textual = QueryDescription::new().filter(Predicate::gte("v", json!(bound.to_string())));
        prop_assert_eq!(ids(&model, &numeric), ids(&model, &textual));

        let expected = values.iter().filter(|v| **v >= bound).count();
        prop_assert_eq!(model.count(&numeric).unwrap(), expected);
    }

    #[test]
    fn sorted_results_are_ordered(values in prop::collection::vec(-100i64..100, 0..20)) {
        let registry = ModelRegistry::new();
        let model = numbers(&registry, &values);

        let sorted: Vec<i64> = model
            .find(&json!({"order": {"v": -1}}))
            .unwrap()
            .iter()
            .map(|i| i.get("v").and_then(|v| v.as_i64()).unwrap())
            .collect();
        let mut expected = values.clone();
        expected.sort_unstable_by(|a, b| b.cmp(a));
        prop_assert_eq!(sorted, expected);
    }
}
