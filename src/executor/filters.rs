//! Predicate filtering for query execution
//!
//! Operands are coerced to the field's type before evaluation, so a
//! stored number matches a numeric string in the query. Numbers compare
//! numerically regardless of integer/float representation.
//!
//! Absent and null fields only satisfy `$ne`, `$nin`, equality with null
//! and `$in` lists containing null.

use std::cmp::Ordering;

use serde_json::Value;

use crate::planner::{FilterOp, Predicate};

/// Evaluates predicates against documents
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a document matches all predicates
    pub fn matches(document: &Value, predicates: &[Predicate]) -> bool {
        predicates
            .iter()
            .all(|pred| Self::matches_predicate(document, pred))
    }

    fn matches_predicate(document: &Value, predicate: &Predicate) -> bool {
        let field_value = match document.get(&predicate.field) {
            Some(v) if !v.is_null() => v,
            _ => return Self::matches_absent(&predicate.op),
        };

        match &predicate.op {
            FilterOp::Eq(expected) => values_equal(field_value, expected),
            FilterOp::Ne(expected) => !values_equal(field_value, expected),
            FilterOp::Gte(bound) => compare(field_value, bound).is_some_and(Ordering::is_ge),
            FilterOp::Gt(bound) => compare(field_value, bound).is_some_and(Ordering::is_gt),
            FilterOp::Lte(bound) => compare(field_value, bound).is_some_and(Ordering::is_le),
            FilterOp::Lt(bound) => compare(field_value, bound).is_some_and(Ordering::is_lt),
            FilterOp::In(values) => values.iter().any(|v| values_equal(field_value, v)),
            FilterOp::Nin(values) => !values.iter().any(|v| values_equal(field_value, v)),
        }
    }

    fn matches_absent(op: &FilterOp) -> bool {
        match op {
            FilterOp::Eq(expected) => expected.is_null(),
            FilterOp::Ne(expected) => !expected.is_null(),
            FilterOp::In(values) => values.iter().any(Value::is_null),
            other => other.matches_absent(),
        }
    }
}

/// Equality with numeric normalization (`30 == 30.0`)
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(xf), Some(yf)) => xf == yf,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Ordering between two values of the same kind; None across kinds
fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual, bound) {
        (Value::Number(a), Value::Number(b)) => {
            if let (Some(ai), Some(bi)) = (a.as_i64(), b.as_i64()) {
                return Some(ai.cmp(&bi));
            }
            a.as_f64()?.partial_cmp(&b.as_f64()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
