//! aeromodel - schema-driven data models over pluggable connectors
//!
//! A model is compiled from a declarative definition of fields, hooks and
//! settings. Instances of it track changes, validate on every write and
//! persist through whatever [`Connector`] the model is bound to. The crate
//! ships an in-memory connector backed by the query executor and an
//! optional read-through cache.
//!
//! ```ignore
//! use aeromodel::{FieldDef, FieldType, ModelDefinition, ModelRegistry};
//! use serde_json::json;
//!
//! let registry = ModelRegistry::new();
//! let user = registry.define(
//!     "user",
//!     ModelDefinition::new()
//!         .field("name", FieldDef::of(FieldType::String).required(true))
//!         .connector_named("memory"),
//! )?;
//! let jeff = user.create(json!({"name": "jeff"}))?;
//! assert_eq!(jeff.id(), Some(json!(1)));
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod connector;
pub mod errors;
pub mod events;
pub mod executor;
pub mod instance;
pub mod model;
pub mod observability;
pub mod planner;
pub mod registry;
pub mod schema;

pub use cache::{CacheConfig, CacheProvider, LruCache};
pub use config::RuntimeConfig;
pub use connector::{Capabilities, Connector, FindAndModifyOptions, MemoryConnector, Operation};
pub use errors::{ErrorCategory, ModelError, ModelResult};
pub use instance::{Collection, Instance, InstanceStatus, PrimaryKeyAlias};
pub use model::{Model, ModelDefinition};
pub use planner::{Predicate, QueryDescription, SortSpec};
pub use registry::ModelRegistry;
pub use schema::{FieldDef, FieldSpec, FieldType, FunctionRegistry};
