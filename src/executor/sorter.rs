//! Result sorting for query execution
//!
//! Sort is stable: records with equal keys keep their input order.

use std::cmp::Ordering;

use serde_json::Value;

use super::result::ResultDocument;
use crate::planner::{SortDirection, SortSpec};

/// Sorts result documents
pub struct ResultSorter;

impl ResultSorter {
    pub fn sort(documents: &mut [ResultDocument], sort_spec: &SortSpec) {
        documents.sort_by(|a, b| {
            let ordering = Self::compare_values(a.body.get(&sort_spec.field), b.body.get(&sort_spec.field));
            match sort_spec.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }

    /// Ordering rules:
    /// - absent < null < bool < number < string < array < object
    /// - same kinds compare naturally; arrays and objects compare equal
    fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let (a_val, b_val) = match (a, b) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a), Some(b)) => (a, b),
        };

        let type_order = |v: &Value| -> u8 {
            match v {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        };
        let (a_type, b_type) = (type_order(a_val), type_order(b_val));
        if a_type != b_type {
            return a_type.cmp(&b_type);
        }

        match (a_val, b_val) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                let xf = x.as_f64().unwrap_or(0.0);
                let yf = y.as_f64().unwrap_or(0.0);
                xf.partial_cmp(&yf).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }
}
