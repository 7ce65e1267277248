//! Conversion of a merged overlay into a validated configuration.

use std::time::Duration;

use seedline_telemetry::LogFormat;
use url::Url;

use crate::defaults::{
    DEFAULT_DEGRADED_THRESHOLD, DEFAULT_LOG_LEVEL, DEFAULT_PENDING_TTL, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, default_log_dir,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{ClientConfig, ConfigOverlay, PathRewrite};

pub(crate) fn build_config(overlay: ConfigOverlay) -> ConfigResult<ClientConfig> {
    let url = parse_url(overlay.url.as_deref())?;
    let (username, password) = credentials(overlay.username, overlay.password)?;

    let degraded_threshold = overlay
        .degraded_threshold
        .unwrap_or(DEFAULT_DEGRADED_THRESHOLD);
    if degraded_threshold == 0 {
        return Err(ConfigError::invalid(
            "degraded_threshold",
            Some("0"),
            "must be at least 1",
        ));
    }

    let log_format = match overlay.log_format.as_deref() {
        None => LogFormat::infer(),
        Some(raw) => raw
            .parse::<LogFormat>()
            .map_err(|reason| ConfigError::invalid("log_format", Some(raw), reason))?,
    };

    let path_rewrites = overlay
        .path_rewrites
        .unwrap_or_default()
        .iter()
        .map(|raw| {
            raw.parse::<PathRewrite>()
                .map_err(|reason| ConfigError::invalid("path_rewrites", Some(raw.as_str()), reason))
        })
        .collect::<ConfigResult<Vec<_>>>()?;

    Ok(ClientConfig {
        url,
        username,
        password,
        accept_invalid_certs: overlay.accept_invalid_certs.unwrap_or(false),
        request_timeout: seconds(
            "request_timeout",
            overlay.request_timeout,
            DEFAULT_REQUEST_TIMEOUT,
        )?,
        poll_interval: seconds("poll_interval", overlay.poll_interval, DEFAULT_POLL_INTERVAL)?,
        degraded_threshold,
        pending_ttl: seconds("pending_ttl", overlay.pending_ttl, DEFAULT_PENDING_TTL)?,
        remote_mode: overlay.remote_mode.unwrap_or(false),
        path_rewrites,
        log_level: overlay
            .log_level
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        log_format,
        log_dir: overlay.log_dir.or_else(default_log_dir),
    })
}

fn parse_url(raw: Option<&str>) -> ConfigResult<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::invalid("url", None, "is required"))?;
    let url = Url::parse(raw).map_err(|err| ConfigError::invalid("url", Some(raw), err.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::invalid(
            "url",
            Some(raw),
            "scheme must be http or https",
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::invalid("url", Some(raw), "must include a host"));
    }
    Ok(url)
}

fn credentials(
    username: Option<String>,
    password: Option<String>,
) -> ConfigResult<(Option<String>, Option<String>)> {
    let username = username.filter(|value| !value.is_empty());
    match (username, password) {
        (Some(username), Some(password)) => Ok((Some(username), Some(password))),
        (None, None) => Ok((None, None)),
        (Some(_), None) => Err(ConfigError::invalid(
            "password",
            None,
            "must be set when a username is configured",
        )),
        (None, Some(_)) => Err(ConfigError::invalid(
            "username",
            None,
            "must be set when a password is configured",
        )),
    }
}

/// Shortest accepted duration.
const MIN_DURATION: Duration = Duration::from_millis(1);

fn seconds(field: &'static str, value: Option<f64>, default: Duration) -> ConfigResult<Duration> {
    let Some(secs) = value else {
        return Ok(default);
    };
    let shown = secs.to_string();
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::invalid(
            field,
            Some(shown.as_str()),
            "must be a positive number of seconds",
        ));
    }
    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|err| ConfigError::invalid(field, Some(shown.as_str()), err.to_string()))?;
    if duration < MIN_DURATION {
        return Err(ConfigError::invalid(
            field,
            Some(shown.as_str()),
            "must be at least one millisecond",
        ));
    }
    Ok(duration)
}
