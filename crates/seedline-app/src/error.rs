//! # Design
//!
//! - Centralize errors that end the process during startup or shutdown.
//! - Keep messages constant and carry the failing operation as a field.
//! - Map each variant onto the exit code the operator sees.

use seedline_torrent_core::RemoteError;
use thiserror::Error;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Exit status for configuration errors.
pub const EXIT_CONFIG: i32 = 2;
/// Exit status for unrecoverable startup or runtime failures.
pub const EXIT_FAILURE: i32 = 1;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded or validated.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: seedline_config::ConfigError,
    },
    /// Logging could not be installed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: seedline_telemetry::TelemetryError,
    },
    /// The daemon could not be reached or refused the session at startup.
    #[error("cannot connect to {url}")]
    Connect {
        /// Operation identifier.
        operation: &'static str,
        /// Connection target.
        url: String,
        /// Source remote error.
        source: RemoteError,
    },
    /// The terminal interface failed.
    #[error("terminal operation failed")]
    Terminal {
        /// Operation identifier.
        operation: &'static str,
        /// Source error from terminal setup, drawing, or teardown.
        source: anyhow::Error,
    },
}

impl AppError {
    pub(crate) const fn config(
        operation: &'static str,
        source: seedline_config::ConfigError,
    ) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn telemetry(
        operation: &'static str,
        source: seedline_telemetry::TelemetryError,
    ) -> Self {
        Self::Telemetry { operation, source }
    }

    pub(crate) const fn connect(operation: &'static str, url: String, source: RemoteError) -> Self {
        Self::Connect {
            operation,
            url,
            source,
        }
    }

    pub(crate) const fn terminal(operation: &'static str, source: anyhow::Error) -> Self {
        Self::Terminal { operation, source }
    }

    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => EXIT_CONFIG,
            Self::Telemetry { .. } | Self::Connect { .. } | Self::Terminal { .. } => EXIT_FAILURE,
        }
    }

    /// Operator-facing message including the source chain.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Config { source, .. } => format!("invalid configuration: {source}"),
            Self::Telemetry { source, .. } => format!("cannot initialise logging: {source}"),
            Self::Connect { url, source, .. } => format!("cannot connect to {url}: {source}"),
            Self::Terminal { source, .. } => format!("terminal error: {source:#}"),
        }
    }
}
