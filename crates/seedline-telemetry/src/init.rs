//! Subscriber installation and logging configuration.
//!
//! # Design
//! - One entry point installs the global subscriber in pretty or JSON form.
//! - `RUST_LOG` overrides the configured level.
//! - The build SHA is recorded once so every span reports the same value.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{Builder as RollingBuilder, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default level when neither `RUST_LOG` nor the configuration names one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_FILE_PREFIX: &str = "seedline";
const LOG_FILE_SUFFIX: &str = "log";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Level directive (e.g. `info`, `seedline_state=debug`).
    pub level: &'a str,
    /// Output format.
    pub format: LogFormat,
    /// Build identifier recorded in the process span.
    pub build_sha: &'a str,
    /// Directory for the rolling log file; stderr is used when absent.
    pub log_dir: Option<&'a Path>,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
            build_sha: build_sha(),
            log_dir: None,
        }
    }
}

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Structured JSON objects, one per line.
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("unknown log format '{other}' (expected pretty or json)")),
        }
    }
}

impl Display for LogFormat {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

/// Keeps the background log writer alive; dropping it flushes pending lines.
#[derive(Debug)]
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the log directory cannot be prepared or a global
/// subscriber has already been installed.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    // First initialisation wins.
    let _ = BUILD_SHA.set(config.build_sha.to_string());

    let (writer, worker) = match config.log_dir {
        Some(dir) => {
            let (writer, guard) = file_writer(dir)?;
            (writer, Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };
    let ansi = worker.is_none();

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(ansi)
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })?;

    Ok(LoggingGuard { _worker: worker })
}

/// Access the build SHA recorded during logging initialisation.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

fn file_writer(dir: &Path) -> Result<(BoxMakeWriter, WorkerGuard)> {
    fs::create_dir_all(dir).map_err(|source| TelemetryError::LogDirectory {
        path: dir.to_path_buf(),
        source,
    })?;
    let appender = RollingBuilder::new()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(7)
        .build(dir)
        .map_err(|source| TelemetryError::Appender {
            path: dir.to_path_buf(),
            source,
        })?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(writer), guard))
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn log_format_deserializes_from_lowercase() -> std::result::Result<(), serde_json::Error> {
        let format: LogFormat = serde_json::from_str("\"pretty\"")?;
        assert_eq!(format, LogFormat::Pretty);
        Ok(())
    }

    #[test]
    fn file_writer_creates_missing_directory() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = tempfile::tempdir()?;
        let dir = root.path().join("nested").join("logs");
        let (_writer, _guard) = file_writer(&dir)?;
        assert!(dir.is_dir());
        Ok(())
    }

    #[test]
    fn build_sha_defaults_to_dev_until_recorded() {
        assert!(!build_sha().is_empty());
    }
}
