//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use tracing_appender::rolling::InitError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised while installing logging.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: TryInitError,
    },
    /// The log directory could not be created.
    LogDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
    /// The rolling file appender could not be opened.
    Appender {
        /// Directory holding the log files.
        path: PathBuf,
        /// Underlying appender error.
        source: InitError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::LogDirectory { path, .. } => {
                write!(formatter, "failed to create log directory {}", path.display())
            }
            Self::Appender { path, .. } => {
                write!(formatter, "failed to open log file in {}", path.display())
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::LogDirectory { source, .. } => Some(source),
            Self::Appender { source, .. } => Some(source),
        }
    }
}
