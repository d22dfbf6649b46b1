//! Value coercion to a declared field type
//!
//! Coercion never fails: a value that cannot be converted is returned
//! unchanged and left for the validators to judge.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use serde_json::{Map, Number, Value};

use super::types::FieldType;

/// Coerce `value` to `field_type`. Untyped fields pass through.
pub fn coerce(field_type: Option<FieldType>, value: Value) -> Value {
    match field_type {
        Some(FieldType::Number) => coerce_number(value),
        Some(FieldType::Boolean) => coerce_boolean(value),
        Some(FieldType::Date) => coerce_date(value),
        Some(FieldType::Object) => match value {
            Value::String(s) if s.is_empty() => Value::Object(Map::new()),
            other => other,
        },
        _ => value,
    }
}

fn coerce_number(value: Value) -> Value {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Value::Number(i.into());
            }
            match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                Some(n) if !trimmed.is_empty() => Value::Number(n),
                _ => Value::String(s),
            }
        }
        other => other,
    }
}

fn coerce_boolean(value: Value) -> Value {
    match &value {
        Value::String(s) => match s.trim() {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => value,
        },
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Value::Bool(true),
            Some(f) if f == 0.0 => Value::Bool(false),
            _ => value,
        },
        _ => value,
    }
}

fn coerce_date(value: Value) -> Value {
    match &value {
        Value::String(s) => match parse_date(s) {
            Some(dt) => Value::String(format_date(&dt)),
            None => value,
        },
        Value::Number(n) => match n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()) {
            Some(dt) => Value::String(format_date(&dt)),
            None => value,
        },
        _ => value,
    }
}

/// Canonical stored form of a date
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses RFC 3339, RFC 2822, `YYYY-MM-DD` and the
/// `Sat Oct 17 2026 10:00:00 GMT+0000 (Zone Name)` form.
pub fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| Utc.from_utc_datetime(&naive));
    }

    // Drop a trailing "(Zone Name)" before parsing the GMT offset form
    let without_zone = match s.find(" (") {
        Some(idx) => &s[..idx],
        None => s,
    };
    DateTime::parse_from_str(without_zone, "%a %b %d %Y %H:%M:%S GMT%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
