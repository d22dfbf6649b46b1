//! Query description parser
//!
//! Accepts the JSON form of a read:
//!
//! ```json
//! { "where": {"age": {"$gte": 30}}, "sel": "name,age", "order": {"age": -1},
//!   "skip": 1, "limit": 2, "page": 1, "per_page": 10, "distinct": "type,name" }
//! ```
//!
//! Keys are case-insensitive. `where` may also be a JSON string holding an
//! object. Explicit `skip`/`limit` take precedence over `page`/`per_page`.

use serde_json::{json, Map, Value};

use super::ast::{split_fields, FilterOp, Predicate, Projection, QueryDescription, SortDirection, SortSpec};
use crate::errors::{ModelError, ModelResult};

/// Default page size when only `page` is given
pub const DEFAULT_PER_PAGE: usize = 10;

impl QueryDescription {
    /// Parse a query description from JSON
    pub fn from_json(value: &Value) -> ModelResult<QueryDescription> {
        let obj = match value {
            Value::Null => return Ok(QueryDescription::new()),
            Value::Object(obj) => obj,
            other => {
                return Err(ModelError::InvalidQuery(format!(
                    "query must be an object, got: {}",
                    other
                )))
            }
        };

        let mut query = QueryDescription::new();
        let mut skip = None;
        let mut limit = None;
        let mut page = None;
        let mut per_page = None;
        let mut sel = None;
        let mut unsel = None;

        for (key, v) in obj {
            match key.to_ascii_lowercase().as_str() {
                "where" => query.predicates = parse_where(v)?,
                "order" | "sort" => query.order = parse_order(v)?,
                "sel" => sel = Some(parse_field_list("sel", v)?),
                "unsel" => unsel = Some(parse_field_list("unsel", v)?),
                "skip" => skip = Some(parse_count("skip", v)?),
                "limit" => limit = Some(parse_count("limit", v)?),
                "page" => page = Some(parse_count("page", v)?),
                "per_page" => per_page = Some(parse_count("per_page", v)?),
                "distinct" => query.distinct = parse_field_list("distinct", v)?,
                _ => {}
            }
        }

        query.projection = match (sel, unsel) {
            (Some(_), Some(_)) => {
                return Err(ModelError::InvalidQuery(
                    "sel and unsel cannot be combined".to_string(),
                ))
            }
            (Some(fields), None) => Projection::Sel(fields),
            (None, Some(fields)) => Projection::Unsel(fields),
            (None, None) => Projection::All,
        };

        if skip.is_none() && limit.is_none() && (page.is_some() || per_page.is_some()) {
            query = query.page(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PER_PAGE));
        } else {
            query = query.skip(skip.unwrap_or(0)).limit(limit.unwrap_or(0));
        }

        Ok(query)
    }
}

impl QueryDescription {
    /// JSON form accepted by [`QueryDescription::from_json`]
    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();

        if !self.predicates.is_empty() {
            let mut clause = Map::new();
            for predicate in &self.predicates {
                let operand = match &predicate.op {
                    FilterOp::Eq(v)
                    | FilterOp::Ne(v)
                    | FilterOp::Gte(v)
                    | FilterOp::Gt(v)
                    | FilterOp::Lte(v)
                    | FilterOp::Lt(v) => v.clone(),
                    FilterOp::In(vs) | FilterOp::Nin(vs) => Value::Array(vs.clone()),
                };
                let ops = clause
                    .entry(predicate.field.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(ops) = ops {
                    ops.insert(predicate.op.op_name().to_string(), operand);
                }
            }
            obj.insert("where".into(), Value::Object(clause));
        }
        if let Some(order) = &self.order {
            let direction = if order.direction == SortDirection::Desc { -1 } else { 1 };
            let mut spec = Map::new();
            spec.insert(order.field.clone(), json!(direction));
            obj.insert("order".into(), Value::Object(spec));
        }
        match &self.projection {
            Projection::All => {}
            Projection::Sel(fields) => {
                obj.insert("sel".into(), json!(fields));
            }
            Projection::Unsel(fields) => {
                obj.insert("unsel".into(), json!(fields));
            }
        }
        if self.skip > 0 {
            obj.insert("skip".into(), json!(self.skip));
        }
        if let Some(limit) = self.limit {
            obj.insert("limit".into(), json!(limit));
        }
        if self.is_distinct() {
            obj.insert("distinct".into(), json!(self.distinct.join(",")));
        }
        Value::Object(obj)
    }
}

/// Parse a `where` clause into predicates
pub fn parse_where(value: &Value) -> ModelResult<Vec<Predicate>> {
    let owned;
    let clause: &Map<String, Value> = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Object(obj) => obj,
        Value::String(s) => {
            owned = serde_json::from_str::<Value>(s).ok();
            match &owned {
                Some(Value::Object(obj)) => obj,
                _ => return Err(invalid_where(value)),
            }
        }
        other => return Err(invalid_where(other)),
    };

    let mut predicates = Vec::new();
    for (field, condition) in clause {
        match condition {
            Value::Object(ops) if !ops.is_empty() && ops.keys().all(|k| k.starts_with('$')) => {
                for (op, operand) in ops {
                    let op = FilterOp::parse(op, operand).ok_or_else(|| {
                        ModelError::InvalidQuery(format!(
                            "unsupported operator \"{}\" on field \"{}\"",
                            op, field
                        ))
                    })?;
                    predicates.push(Predicate::new(field.clone(), op));
                }
            }
            other => predicates.push(Predicate::eq(field.clone(), other.clone())),
        }
    }
    Ok(predicates)
}

fn invalid_where(value: &Value) -> ModelError {
    ModelError::InvalidQuery(format!("invalid where clause: {}", value))
}

fn parse_order(value: &Value) -> ModelResult<Option<SortSpec>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(split_fields(s).first().and_then(|f| SortSpec::from_prefixed(f))),
        Value::Object(obj) => {
            let Some((field, direction)) = obj.iter().next() else {
                return Ok(None);
            };
            let descending = match direction {
                Value::Number(n) => n.as_f64().map(|f| f < 0.0).unwrap_or(false),
                Value::String(s) => {
                    let s = s.trim().to_ascii_lowercase();
                    s == "desc" || s.starts_with('-')
                }
                _ => false,
            };
            let spec = SortSpec::from_prefixed(field)
                .ok_or_else(|| ModelError::InvalidQuery(format!("invalid order field \"{}\"", field)))?;
            Ok(Some(if descending {
                SortSpec::desc(spec.field)
            } else {
                spec
            }))
        }
        other => Err(ModelError::InvalidQuery(format!("invalid order: {}", other))),
    }
}

fn parse_field_list(key: &str, value: &Value) -> ModelResult<Vec<String>> {
    match value {
        Value::String(s) => Ok(split_fields(s)),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| ModelError::InvalidQuery(format!("{} entries must be strings", key)))
            })
            .collect(),
        Value::Object(obj) => Ok(obj
            .iter()
            .filter(|(_, flag)| !matches!(flag, Value::Bool(false)) && flag.as_i64() != Some(0))
            .map(|(field, _)| field.clone())
            .collect()),
        other => Err(ModelError::InvalidQuery(format!("invalid {}: {}", key, other))),
    }
}

fn parse_count(key: &str, value: &Value) -> ModelResult<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .map(|n| usize::try_from(n).unwrap_or(usize::MAX))
        .ok_or_else(|| ModelError::InvalidQuery(format!("{} must be a non-negative integer, got: {}", key, value)))
}
