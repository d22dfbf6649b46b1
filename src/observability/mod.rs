//! Observability subsystem for aeromodel
//!
//! # Principles
//!
//! 1. Observability is read-only: no log call changes behavior
//! 2. Library code emits through `tracing` and never installs a subscriber
//! 3. Every record names its [`Event`]
//!
//! # Usage
//!
//! ```ignore
//! use aeromodel::observability::{init_logging, Event};
//!
//! init_logging("aeromodel=debug")?;
//! tracing::info!(target: "aeromodel::model", event = %Event::ModelRegistered, model = "user");
//! ```

mod events;

pub use events::Event;

use tracing_subscriber::EnvFilter;

use crate::errors::{ModelError, ModelResult};

/// Default filter directive
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Build the filter: `RUST_LOG` wins over `directives`
pub fn env_filter(directives: &str) -> ModelResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directives = if directives.trim().is_empty() {
        DEFAULT_LOG_FILTER
    } else {
        directives
    };
    EnvFilter::try_new(directives)
        .map_err(|e| ModelError::Config(format!("invalid log filter \"{}\": {}", directives, e)))
}

/// Install a stderr fmt subscriber. Fails if one is already installed.
pub fn init_logging(directives: &str) -> ModelResult<()> {
    let filter = env_filter(directives)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|e| ModelError::Config(format!("failed to install log subscriber: {}", e)))
}
