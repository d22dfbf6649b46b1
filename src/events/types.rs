//! Typed event payloads
//!
//! Each bus carries exactly one of these enums.

use serde_json::Value;

use crate::connector::Operation;
use crate::model::Model;

/// Events published on an instance's bus
#[derive(Debug, Clone, PartialEq)]
pub enum InstanceEvent {
    /// A field value changed through `set`/`change`
    Change {
        field: String,
        value: Value,
        previous: Option<Value>,
    },
    /// The instance was persisted
    Save,
    /// The instance was deleted
    Delete,
}

impl InstanceEvent {
    /// Event name, e.g. `change:age`
    pub fn name(&self) -> String {
        match self {
            InstanceEvent::Change { field, .. } => format!("change:{}", field),
            InstanceEvent::Save => "save".to_string(),
            InstanceEvent::Delete => "delete".to_string(),
        }
    }
}

/// Phase of a generated model operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

/// Events published on a model's bus around generated operations
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvent {
    /// Configured event name (e.g. `beforeCreate`)
    pub event: String,
    pub phase: HookPhase,
    pub operation: Operation,
    /// Operation input for `Before`, operation result for `After`
    pub payload: Value,
}

/// Events published on a registry's bus
#[derive(Debug, Clone)]
pub enum RegistryEvent {
    /// A model was compiled and registered (possibly replacing one of the same name)
    Registered(Model),
    /// All models were removed
    Cleared,
}

/// Events published by connectors
#[derive(Debug, Clone)]
pub enum ConnectorEvent {
    /// The connector was bound to a model for the first time
    InitModel(Model),
}
