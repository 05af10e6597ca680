//! Error types for Project Skirmish.

use thiserror::Error;

/// Errors raised while loading or saving configuration files
/// (combat profiles, scenario scripts).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file was read but could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value was parsed but is unusable
    #[error("Invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    /// Builds an [`ConfigError::Invalid`] error.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
