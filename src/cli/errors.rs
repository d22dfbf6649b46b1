//! CLI error types
//!
//! Every CLI error is fatal: it is printed to stderr and the process exits 1.

use std::io;

use thiserror::Error;

use crate::errors::ModelError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// Failure inside the modeling runtime
    #[error("{0}")]
    Model(#[from] ModelError),

    /// File or stream I/O failure
    #[error("{0}")]
    Io(String),

    /// Arguments that parse but cannot be acted on
    #[error("{0}")]
    Usage(String),
}

impl CliError {
    pub fn io_error(msg: impl Into<String>) -> Self {
        CliError::Io(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        CliError::Usage(msg.into())
    }

    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Model(e) => e.code(),
            CliError::Io(_) => "CLI_IO_ERROR",
            CliError::Usage(_) => "CLI_USAGE_ERROR",
        }
    }

    /// One-line form for stderr
    pub fn report(&self) -> String {
        match self {
            CliError::Model(e) => e.report(),
            other => format!("{}: {}", other.code(), other),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
