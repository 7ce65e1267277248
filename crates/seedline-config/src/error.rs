//! Error types for configuration loading.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when it is safe to echo.
        value: Option<String>,
        /// Human-readable reason for the failure.
        reason: String,
    },
    /// The configuration file could not be read.
    #[error("failed to read configuration file {}", path.display())]
    Io {
        /// File that could not be read.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The configuration file is not valid YAML for the expected shape.
    #[error("failed to parse configuration file {}: {source}", path.display())]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Source YAML error.
        source: serde_yaml::Error,
    },
}

impl ConfigError {
    pub(crate) fn invalid(
        field: &'static str,
        value: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            field,
            value: value.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
