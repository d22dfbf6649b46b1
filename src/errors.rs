//! Error taxonomy for aeromodel
//!
//! Error codes:
//! - MODEL_MISSING_DEFINITION (DEFINITION)
//! - MODEL_INVALID_NAME (DEFINITION)
//! - MODEL_INVALID_FIELD (DEFINITION)
//! - MODEL_INVALID_ARGUMENT (DEFINITION)
//! - MODEL_VALIDATION_FAILED (VALIDATION)
//! - MODEL_REQUIRED_FIELD (VALIDATION)
//! - MODEL_READ_ONLY_FIELD (VALIDATION)
//! - MODEL_ALREADY_DELETED (STATE)
//! - MODEL_MISSING_CONNECTOR (STATE)
//! - MODEL_UNSUPPORTED_OPERATION (STATE)
//! - MODEL_INVALID_QUERY (QUERY)
//! - MODEL_CONNECTOR_ERROR (CONNECTOR)
//! - MODEL_CONFIG_ERROR (CONFIG)

use std::fmt;

use thiserror::Error;

/// Result type for every fallible aeromodel operation
pub type ModelResult<T> = Result<T, ModelError>;

/// Why a model name was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameViolation {
    /// Characters that would need URL encoding (spaces, non-ASCII, ...)
    UrlUnsafe,
    /// Periods are reserved for namespacing
    Period,
}

/// Broad class of an error, used for reporting and exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Definition,
    Validation,
    State,
    Query,
    Connector,
    Config,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::Definition => "DEFINITION",
            ErrorCategory::Validation => "VALIDATION",
            ErrorCategory::State => "STATE",
            ErrorCategory::Query => "QUERY",
            ErrorCategory::Connector => "CONNECTOR",
            ErrorCategory::Config => "CONFIG",
        };
        write!(f, "{}", s)
    }
}

/// Errors raised by model definition, instance mutation and connector operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    // ==================
    // Definition Errors
    // ==================
    /// `define` was called without a definition
    #[error("missing required definition")]
    MissingDefinition,

    /// Model name contains forbidden characters
    #[error("{}", invalid_name_message(.name, .violation))]
    InvalidName {
        name: String,
        violation: NameViolation,
    },

    /// Field declaration could not be compiled
    #[error("{message}")]
    InvalidField { field: String, message: String },

    /// Argument of the wrong shape
    #[error("{0}")]
    InvalidArgument(String),

    // ==================
    // Validation Errors
    // ==================
    /// One or more field validators (or the model validator) rejected a value
    #[error("{message}")]
    Validation { fields: Vec<String>, message: String },

    /// Required field has no value
    #[error("required field value missing: {0}")]
    RequiredField(String),

    /// Read-only field written without force
    #[error("cannot set read-only field: {0}")]
    ReadOnlyField(String),

    // ==================
    // State Errors
    // ==================
    /// Save or delete on a deleted instance
    #[error("instance has already been deleted")]
    AlreadyDeleted,

    /// Connector-backed operation on a model without a connector
    #[error("missing required connector")]
    MissingConnector,

    /// Bound connector does not implement the operation
    #[error("connector {connector} does not support {operation}")]
    Unsupported { connector: String, operation: String },

    // ==================
    // Query Errors
    // ==================
    /// Malformed query description
    #[error("{0}")]
    InvalidQuery(String),

    // ==================
    // Pass-through Errors
    // ==================
    /// Storage failure reported by a connector, passed through unchanged
    #[error("{0}")]
    Connector(String),

    /// Configuration file could not be read or is invalid
    #[error("{0}")]
    Config(String),
}

fn invalid_name_message(name: &str, violation: &NameViolation) -> String {
    match violation {
        NameViolation::UrlUnsafe => format!(
            "Model names cannot contain characters that need to be encoded in a URL: \"{}\"",
            name
        ),
        NameViolation::Period => format!("Model names cannot contain periods: \"{}\"", name),
    }
}

impl ModelError {
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Single-field validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::Validation {
            fields: vec![field.into()],
            message: message.into(),
        }
    }

    pub fn unsupported(connector: impl Into<String>, operation: impl fmt::Display) -> Self {
        ModelError::Unsupported {
            connector: connector.into(),
            operation: operation.to_string(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::MissingDefinition => "MODEL_MISSING_DEFINITION",
            ModelError::InvalidName { .. } => "MODEL_INVALID_NAME",
            ModelError::InvalidField { .. } => "MODEL_INVALID_FIELD",
            ModelError::InvalidArgument(_) => "MODEL_INVALID_ARGUMENT",
            ModelError::Validation { .. } => "MODEL_VALIDATION_FAILED",
            ModelError::RequiredField(_) => "MODEL_REQUIRED_FIELD",
            ModelError::ReadOnlyField(_) => "MODEL_READ_ONLY_FIELD",
            ModelError::AlreadyDeleted => "MODEL_ALREADY_DELETED",
            ModelError::MissingConnector => "MODEL_MISSING_CONNECTOR",
            ModelError::Unsupported { .. } => "MODEL_UNSUPPORTED_OPERATION",
            ModelError::InvalidQuery(_) => "MODEL_INVALID_QUERY",
            ModelError::Connector(_) => "MODEL_CONNECTOR_ERROR",
            ModelError::Config(_) => "MODEL_CONFIG_ERROR",
        }
    }

    /// Returns the category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            ModelError::MissingDefinition
            | ModelError::InvalidName { .. }
            | ModelError::InvalidField { .. }
            | ModelError::InvalidArgument(_) => ErrorCategory::Definition,
            ModelError::Validation { .. }
            | ModelError::RequiredField(_)
            | ModelError::ReadOnlyField(_) => ErrorCategory::Validation,
            ModelError::AlreadyDeleted
            | ModelError::MissingConnector
            | ModelError::Unsupported { .. } => ErrorCategory::State,
            ModelError::InvalidQuery(_) => ErrorCategory::Query,
            ModelError::Connector(_) => ErrorCategory::Connector,
            ModelError::Config(_) => ErrorCategory::Config,
        }
    }

    /// The offending field(s), comma-joined, when the error names any
    pub fn field(&self) -> Option<String> {
        match self {
            ModelError::InvalidField { field, .. } => Some(field.clone()),
            ModelError::Validation { fields, .. } => Some(fields.join(", ")),
            ModelError::RequiredField(field) | ModelError::ReadOnlyField(field) => {
                Some(field.clone())
            }
            _ => None,
        }
    }

    /// Formats as `[CATEGORY] CODE: message` for command-line reporting
    pub fn report(&self) -> String {
        format!("[{}] {}: {}", self.category(), self.code(), self)
    }
}
