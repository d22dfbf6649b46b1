//! Field type tags
//!
//! Supported types:
//! - string: UTF-8 string
//! - number: integer or floating point
//! - boolean: true / false
//! - date: RFC 3339 timestamp (stored as a string)
//! - array: list of values, optionally of a child model
//! - object: nested structure, optionally of a child model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical field type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Object,
}

impl FieldType {
    /// Parses a type name case-insensitively (`String`, `NUMBER`, `boolean`, ...)
    pub fn parse(name: &str) -> Option<FieldType> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" => Some(FieldType::String),
            "number" => Some(FieldType::Number),
            "boolean" => Some(FieldType::Boolean),
            "date" => Some(FieldType::Date),
            "array" => Some(FieldType::Array),
            "object" => Some(FieldType::Object),
            _ => None,
        }
    }

    /// Returns the canonical lowercase name
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Array => "array",
            FieldType::Object => "object",
        }
    }

    /// Whether values of this type may hold a nested child model
    pub fn is_structural(&self) -> bool {
        matches!(self, FieldType::Array | FieldType::Object)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}
