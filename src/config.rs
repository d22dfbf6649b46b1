//! Runtime configuration
//!
//! A JSON file where every key is optional:
//!
//! ```json
//! { "cache_enabled": true, "cache_max": 500, "cache_max_age_ms": 60000,
//!   "log_filter": "aeromodel=debug", "definitions": "./models.json" }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::{CacheConfig, DEFAULT_MAX_ENTRIES};
use crate::errors::{ModelError, ModelResult};
use crate::observability::{Event, DEFAULT_LOG_FILTER};

/// Process-wide settings for the runtime and the binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Cache reads for models that do not configure a cache themselves
    #[serde(default)]
    pub cache_enabled: bool,

    /// Maximum cached records per model
    #[serde(default = "default_cache_max")]
    pub cache_max: usize,

    /// Entry lifetime in milliseconds, 0 for no limit
    #[serde(default)]
    pub cache_max_age_ms: u64,

    /// tracing-subscriber filter directives
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Model definitions file
    #[serde(default)]
    pub definitions: Option<PathBuf>,
}

fn default_cache_max() -> usize {
    DEFAULT_MAX_ENTRIES
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cache_enabled: false,
            cache_max: default_cache_max(),
            cache_max_age_ms: 0,
            log_filter: default_log_filter(),
            definitions: None,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ModelResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| ModelError::Config(format!("Failed to read config {}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;

        info!(
            target: "aeromodel::config",
            event = %Event::ConfigLoaded,
            path = %path.display(),
            cache_enabled = config.cache_enabled
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn parse(content: &str) -> ModelResult<Self> {
        let config: RuntimeConfig = serde_json::from_str(content)
            .map_err(|e| ModelError::Config(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ModelResult<()> {
        if self.cache_enabled && self.cache_max == 0 {
            return Err(ModelError::Config(
                "cache_max must be > 0 when cache_enabled is true".to_string(),
            ));
        }

        if self.log_filter.trim().is_empty() {
            return Err(ModelError::Config("log_filter must not be empty".to_string()));
        }

        Ok(())
    }

    /// Cache settings for models that leave caching unconfigured
    pub fn cache_config(&self) -> CacheConfig {
        if !self.cache_enabled {
            return CacheConfig::Off;
        }
        CacheConfig::Lru {
            max: self.cache_max,
            max_age: (self.cache_max_age_ms > 0).then(|| Duration::from_millis(self.cache_max_age_ms)),
        }
    }
}
