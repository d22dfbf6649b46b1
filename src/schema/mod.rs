//! Field schema subsystem for aeromodel
//!
//! Normalizes declarative field declarations at model definition time
//! and enforces them on every mutation.
//!
//! # Design Principles
//!
//! - Compile once, immutable afterwards
//! - `required == !optional` after compilation
//! - Coercion never fails; validators decide
//! - Field logic is supplied as functions or resolved by name, never evaluated from source

mod coerce;
mod compiler;
mod field;
mod functions;
mod types;
mod validator;

pub use coerce::{coerce, format_date, parse_date};
pub use compiler::{compile_field, resolve_optionality, FieldSpec, RESERVED_PRIMARY_KEY};
pub use field::{DefaultValue, FieldDef, FieldFn, ValidatorDef};
pub use functions::{Accessor, FunctionRegistry, TransformFn, ValidatorFn};
pub use types::FieldType;
pub use validator::{display_value, LengthConstraints, Validator};
