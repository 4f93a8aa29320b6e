//! Error types for ezdir operations.
//!
//! One error enum covers the whole workspace: the LDIF engine raises the
//! template/parse variants, the directory client raises the transport
//! variants. All variants carry owned strings so errors stay `Clone`.

use thiserror::Error;

/// Main error type for ezdir operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A template placeholder had no replacement value
    #[error("no replacement supplied for placeholder `{placeholder}`")]
    Template {
        /// Name of the placeholder that was not supplied
        placeholder: String,
    },

    /// Structurally invalid LDIF record
    #[error("malformed LDIF record: {0}")]
    MalformedRecord(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Invalid distinguished name
    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Operation timed out
    #[error("Timeout waiting for directory: {0}")]
    Timeout(String),

    /// Directory server error
    #[error("External service error: {service}: {message}")]
    ExternalService {
        /// Service name that failed
        service: String,
        /// Error message
        message: String,
    },
}

/// Specialized result type for ezdir operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Template { .. } => "TEMPLATE_ERROR",
            Self::MalformedRecord(_) => "MALFORMED_RECORD",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Io(_) => "IO_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::InvalidDn(_) => "INVALID_DN",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Timeout(_) => "TIMEOUT",
            Self::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
        }
    }

    /// Creates a template error naming the missing placeholder.
    #[must_use]
    pub fn missing_placeholder(placeholder: impl Into<String>) -> Self {
        Self::Template {
            placeholder: placeholder.into(),
        }
    }
}

// Conversions from external error types
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(err.to_string())
        } else {
            Self::Io(err.to_string())
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ConfigError(err.to_string())
    }
}
