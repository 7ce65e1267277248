//! Configuration models.

use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use seedline_telemetry::LogFormat;
use serde::Deserialize;
use url::Url;

/// Validated client configuration.
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL of the daemon's WebUI.
    pub url: Url,
    /// WebUI username.
    pub username: Option<String>,
    /// WebUI password.
    pub password: Option<String>,
    /// Accept self-signed or otherwise invalid TLS certificates.
    pub accept_invalid_certs: bool,
    /// Bounded timeout of every daemon call.
    pub request_timeout: Duration,
    /// Delay between two reconciliations.
    pub poll_interval: Duration,
    /// Consecutive failed polls before the view is flagged stale.
    pub degraded_threshold: u32,
    /// Lifetime of a confirmed optimistic status the daemon never converges on.
    pub pending_ttl: Duration,
    /// The daemon runs on another machine; opening files is disabled.
    pub remote_mode: bool,
    /// Daemon-side to local path prefix mappings.
    pub path_rewrites: Vec<PathRewrite>,
    /// Log level directive.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Directory for the rolling log file.
    pub log_dir: Option<PathBuf>,
}

impl ClientConfig {
    /// Username/password pair when both are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.username
            .as_deref()
            .zip(self.password.as_deref())
    }
}

impl Debug for ClientConfig {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("url", &self.url.as_str())
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("request_timeout", &self.request_timeout)
            .field("poll_interval", &self.poll_interval)
            .field("degraded_threshold", &self.degraded_threshold)
            .field("pending_ttl", &self.pending_ttl)
            .field("remote_mode", &self.remote_mode)
            .field("path_rewrites", &self.path_rewrites)
            .field("log_level", &self.log_level)
            .field("log_format", &self.log_format)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}

/// Maps a path prefix reported by the daemon onto a local prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRewrite {
    /// Prefix as reported by the daemon.
    pub from: PathBuf,
    /// Local replacement prefix.
    pub to: PathBuf,
}

impl FromStr for PathRewrite {
    type Err = String;

    /// Parse `from:to`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (from, to) = value
            .split_once(':')
            .ok_or_else(|| "expected 'from:to'".to_string())?;
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() {
            return Err("both sides of 'from:to' must be non-empty".to_string());
        }
        Ok(Self {
            from: PathBuf::from(from),
            to: PathBuf::from(to),
        })
    }
}

/// One configuration layer with every field optional.
///
/// The YAML file and the command line each produce an overlay; later layers
/// win field by field.
#[derive(Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverlay {
    /// Base URL of the daemon's WebUI.
    pub url: Option<String>,
    /// WebUI username.
    pub username: Option<String>,
    /// WebUI password.
    pub password: Option<String>,
    /// Accept invalid TLS certificates.
    pub accept_invalid_certs: Option<bool>,
    /// Request timeout in seconds.
    pub request_timeout: Option<f64>,
    /// Poll interval in seconds.
    pub poll_interval: Option<f64>,
    /// Failed polls before the degraded indicator shows.
    pub degraded_threshold: Option<u32>,
    /// Confirmed override lifetime in seconds.
    pub pending_ttl: Option<f64>,
    /// Disable opening files.
    pub remote_mode: Option<bool>,
    /// `from:to` path rewrites.
    pub path_rewrites: Option<Vec<String>>,
    /// Log level directive.
    pub log_level: Option<String>,
    /// `pretty` or `json`.
    pub log_format: Option<String>,
    /// Log directory.
    pub log_dir: Option<PathBuf>,
}

impl ConfigOverlay {
    /// Layer `other` on top of `self`; fields set in `other` win.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            url: other.url.or(self.url),
            username: other.username.or(self.username),
            password: other.password.or(self.password),
            accept_invalid_certs: other.accept_invalid_certs.or(self.accept_invalid_certs),
            request_timeout: other.request_timeout.or(self.request_timeout),
            poll_interval: other.poll_interval.or(self.poll_interval),
            degraded_threshold: other.degraded_threshold.or(self.degraded_threshold),
            pending_ttl: other.pending_ttl.or(self.pending_ttl),
            remote_mode: other.remote_mode.or(self.remote_mode),
            path_rewrites: other.path_rewrites.or(self.path_rewrites),
            log_level: other.log_level.or(self.log_level),
            log_format: other.log_format.or(self.log_format),
            log_dir: other.log_dir.or(self.log_dir),
        }
    }
}

impl Debug for ConfigOverlay {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ConfigOverlay")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_layer_wins_field_by_field() {
        let file = ConfigOverlay {
            url: Some("http://nas:8080".into()),
            username: Some("admin".into()),
            poll_interval: Some(5.0),
            ..ConfigOverlay::default()
        };
        let cli = ConfigOverlay {
            url: Some("http://localhost:8080".into()),
            remote_mode: Some(true),
            ..ConfigOverlay::default()
        };
        let merged = file.merge(cli);
        assert_eq!(merged.url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(merged.username.as_deref(), Some("admin"));
        assert_eq!(merged.poll_interval, Some(5.0));
        assert_eq!(merged.remote_mode, Some(true));
    }

    #[test]
    fn path_rewrite_parses_pairs() {
        let rewrite: PathRewrite = "/downloads : /mnt/nas".parse().expect("valid rewrite");
        assert_eq!(rewrite.from, PathBuf::from("/downloads"));
        assert_eq!(rewrite.to, PathBuf::from("/mnt/nas"));
        assert!("/downloads".parse::<PathRewrite>().is_err());
        assert!(":/mnt".parse::<PathRewrite>().is_err());
    }

    #[test]
    fn debug_output_redacts_password() {
        let overlay = ConfigOverlay {
            password: Some("hunter2".into()),
            ..ConfigOverlay::default()
        };
        assert!(!format!("{overlay:?}").contains("hunter2"));
    }
}
