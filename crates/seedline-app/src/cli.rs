//! Command-line surface. Every flag may also come from a `SEEDLINE_*`
//! environment variable and overrides the configuration file.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use seedline_config::ConfigOverlay;

/// Terminal client for a qBittorrent daemon.
#[derive(Debug, Parser)]
#[command(name = "seedline", version, about = "Terminal client for a qBittorrent daemon")]
pub struct Cli {
    /// Base URL of the daemon's WebUI, e.g. `http://localhost:8080`.
    #[arg(long, short = 'u', env = "SEEDLINE_URL")]
    pub url: Option<String>,
    /// WebUI username.
    #[arg(long, env = "SEEDLINE_USERNAME")]
    pub username: Option<String>,
    /// WebUI password.
    #[arg(long, env = "SEEDLINE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// YAML configuration file; defaults to `$XDG_CONFIG_HOME/seedline/config.yaml`.
    #[arg(long, short = 'c', env = "SEEDLINE_CONFIG")]
    pub config: Option<PathBuf>,
    /// Accept self-signed or otherwise invalid TLS certificates.
    #[arg(long, env = "SEEDLINE_INSECURE", action = ArgAction::SetTrue)]
    pub insecure: bool,
    /// Timeout of each daemon call, in seconds.
    #[arg(long, env = "SEEDLINE_REQUEST_TIMEOUT")]
    pub request_timeout: Option<f64>,
    /// Delay between two polls, in seconds.
    #[arg(long, env = "SEEDLINE_POLL_INTERVAL")]
    pub poll_interval: Option<f64>,
    /// Consecutive failed polls before the view is marked stale.
    #[arg(long, env = "SEEDLINE_DEGRADED_THRESHOLD")]
    pub degraded_threshold: Option<u32>,
    /// How long an accepted command's status is shown before the daemon catches up, in seconds.
    #[arg(long, env = "SEEDLINE_PENDING_TTL")]
    pub pending_ttl: Option<f64>,
    /// The daemon runs on another machine; disable opening files.
    #[arg(long, env = "SEEDLINE_REMOTE", action = ArgAction::SetTrue)]
    pub remote: bool,
    /// Map daemon paths to local ones, as `from:to` pairs.
    #[arg(long = "path-rewrite", env = "SEEDLINE_PATH_REWRITES", value_delimiter = ',')]
    pub path_rewrites: Vec<String>,
    /// Log level directive; `RUST_LOG` takes precedence.
    #[arg(long, env = "SEEDLINE_LOG_LEVEL")]
    pub log_level: Option<String>,
    /// Log format: `pretty` or `json`.
    #[arg(long, env = "SEEDLINE_LOG_FORMAT")]
    pub log_format: Option<String>,
    /// Directory for the rolling log file.
    #[arg(long, env = "SEEDLINE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Flags as the last configuration layer. Unset flags leave the file's
    /// values in place.
    #[must_use]
    pub fn overlay(&self) -> ConfigOverlay {
        ConfigOverlay {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            accept_invalid_certs: self.insecure.then_some(true),
            request_timeout: self.request_timeout,
            poll_interval: self.poll_interval,
            degraded_threshold: self.degraded_threshold,
            pending_ttl: self.pending_ttl,
            remote_mode: self.remote.then_some(true),
            path_rewrites: (!self.path_rewrites.is_empty()).then(|| self.path_rewrites.clone()),
            log_level: self.log_level.clone(),
            log_format: self.log_format.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_become_an_overlay() {
        let cli = Cli::try_parse_from([
            "seedline",
            "--url",
            "http://nas:8080",
            "--poll-interval",
            "0.5",
            "--remote",
            "--path-rewrite",
            "/downloads:/mnt/a,/data:/mnt/b",
        ])
        .expect("valid flags");
        let overlay = cli.overlay();
        assert_eq!(overlay.url.as_deref(), Some("http://nas:8080"));
        assert_eq!(overlay.poll_interval, Some(0.5));
        assert_eq!(overlay.remote_mode, Some(true));
        assert_eq!(overlay.path_rewrites.map(|rewrites| rewrites.len()), Some(2));
        assert_eq!(overlay.accept_invalid_certs, None);
        assert_eq!(overlay.username, None);
    }

    #[test]
    fn unset_switches_do_not_override_the_file() {
        let cli = Cli::try_parse_from(["seedline"]).expect("no flags");
        let file = ConfigOverlay {
            remote_mode: Some(true),
            path_rewrites: Some(vec!["/a:/b".into()]),
            ..ConfigOverlay::default()
        };
        let merged = file.merge(cli.overlay());
        assert_eq!(merged.remote_mode, Some(true));
        assert_eq!(merged.path_rewrites.map(|rewrites| rewrites.len()), Some(1));
    }
}
