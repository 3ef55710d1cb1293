//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The file extension is not a supported format
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// An environment override could not be parsed
    #[error("Invalid value for {var}: {message}")]
    Env {
        /// Environment variable name
        var: String,
        /// Parse message
        message: String,
    },

    /// A value failed validation
    #[error("Invalid configuration for '{field}': {message}")]
    Validation {
        /// Offending field path
        field: String,
        /// Validation message
        message: String,
    },
}

impl ConfigError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<ConfigError> for mesh_core::MeshError {
    fn from(err: ConfigError) -> Self {
        Self::configuration(err.to_string())
    }
}
