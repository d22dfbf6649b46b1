//! Model schema subsystem for aeromodel
//!
//! # Design Principles
//!
//! - A definition is compiled once into an immutable model
//! - Models live in an explicit registry, never in global state
//! - Generated operations exist only for what the bound connector implements
//! - Derived models (`extend`, `reduce`) are new registrations; the base is untouched

mod definition;
mod hooks;
#[allow(clippy::module_inception)]
mod model;
mod operations;

pub use definition::{ConnectorRef, MappingDef, MethodFn, ModelDefinition, SerializeFn};
pub use hooks::{HookDefinition, OperationHooks};
pub use model::{validate_model_name, ExtendSource, Model};
