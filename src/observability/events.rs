//! Observable event names for aeromodel
//!
//! Every tracing record emitted by the crate carries one of these as its
//! `event` field, so log consumers can filter on a stable name.

use std::fmt;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Runtime configuration loaded
    ConfigLoaded,
    /// Model definitions loaded from JSON
    DefinitionsLoaded,

    // Registry
    /// A model was compiled and registered
    ModelRegistered,
    /// Every model was removed from a registry
    RegistryCleared,
    /// A connector was bound to a model
    ConnectorBound,

    // Instance lifecycle
    InstanceCreated,
    InstanceSaved,
    InstanceDeleted,
    /// All records of a model were removed
    RecordsDeleted,
    /// One element of a batch operation failed
    BatchItemFailed,

    // Query
    QueryExecuted,

    // Cache
    CacheHit,
    CacheMiss,
    CacheReset,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "config.loaded",
            Event::DefinitionsLoaded => "definitions.loaded",

            Event::ModelRegistered => "model.registered",
            Event::RegistryCleared => "registry.cleared",
            Event::ConnectorBound => "connector.bound",

            Event::InstanceCreated => "instance.created",
            Event::InstanceSaved => "instance.saved",
            Event::InstanceDeleted => "instance.deleted",
            Event::RecordsDeleted => "records.deleted",
            Event::BatchItemFailed => "batch.item_failed",

            Event::QueryExecuted => "query.executed",

            Event::CacheHit => "cache.hit",
            Event::CacheMiss => "cache.miss",
            Event::CacheReset => "cache.reset",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_dotted_names() {
        let events = [
            Event::ConfigLoaded,
            Event::DefinitionsLoaded,
            Event::ModelRegistered,
            Event::RegistryCleared,
            Event::ConnectorBound,
            Event::InstanceCreated,
            Event::InstanceSaved,
            Event::InstanceDeleted,
            Event::RecordsDeleted,
            Event::BatchItemFailed,
            Event::QueryExecuted,
            Event::CacheHit,
            Event::CacheMiss,
            Event::CacheReset,
        ];

        for event in events {
            let s = event.as_str();
            let (scope, name) = s.split_once('.').unwrap();
            assert!(!scope.is_empty() && !name.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_lowercase() || c == '.' || c == '_'));
        }
    }

    #[test]
    fn test_event_display() {
        assert_eq!(format!("{}", Event::CacheHit), "cache.hit");
        assert_eq!(format!("{}", Event::BatchItemFailed), "batch.item_failed");
    }
}
