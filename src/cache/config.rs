//! Cache selection for a model

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::lru::{LruCache, DEFAULT_MAX_ENTRIES};
use super::provider::CacheProvider;
use crate::errors::{ModelError, ModelResult};

/// How a model caches connector reads
#[derive(Clone, Default)]
pub enum CacheConfig {
    /// No caching
    #[default]
    Off,
    /// Built-in LRU with default bounds
    Default,
    /// Built-in LRU with explicit bounds
    Lru {
        max: usize,
        max_age: Option<Duration>,
    },
    /// Caller-supplied provider
    Custom(Arc<dyn CacheProvider>),
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheConfig::Off => write!(f, "Off"),
            CacheConfig::Default => write!(f, "Default"),
            CacheConfig::Lru { max, max_age } => f
                .debug_struct("Lru")
                .field("max", max)
                .field("max_age", max_age)
                .finish(),
            CacheConfig::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, CacheConfig::Off)
    }

    /// Build the provider, if any
    pub fn build(&self) -> Option<Arc<dyn CacheProvider>> {
        match self {
            CacheConfig::Off => None,
            CacheConfig::Default => Some(Arc::new(LruCache::new(DEFAULT_MAX_ENTRIES, None))),
            CacheConfig::Lru { max, max_age } => Some(Arc::new(LruCache::new(*max, *max_age))),
            CacheConfig::Custom(provider) => Some(Arc::clone(provider)),
        }
    }

    /// `true` / `false` / `null` or `{"max": n, "maxAge": ms}`
    pub fn from_json(value: &Value) -> ModelResult<CacheConfig> {
        match value {
            Value::Null | Value::Bool(false) => Ok(CacheConfig::Off),
            Value::Bool(true) => Ok(CacheConfig::Default),
            Value::Object(obj) => {
                let number = |key: &str| -> ModelResult<Option<u64>> {
                    match obj.get(key) {
                        None | Some(Value::Null) => Ok(None),
                        Some(v) => v.as_u64().map(Some).ok_or_else(|| {
                            ModelError::InvalidArgument(format!(
                                "cache option \"{}\" must be a non-negative integer",
                                key
                            ))
                        }),
                    }
                };
                let max = number("max")?.map(|n| n as usize).unwrap_or(DEFAULT_MAX_ENTRIES);
                let max_age = number("maxAge")?.filter(|ms| *ms > 0).map(Duration::from_millis);
                Ok(CacheConfig::Lru { max, max_age })
            }
            other => Err(ModelError::InvalidArgument(format!(
                "cache must be a boolean or an options object, got: {}",
                other
            ))),
        }
    }
}
