//! Startup, wiring, and shutdown.
//!
//! # Design
//! - Configuration and logging come first so every later failure is logged.
//! - The daemon must accept the credentials and answer one listing before the
//!   interface starts; either failure ends the process with a non-zero status.
//! - Shutdown stops polling before closing the session.

use std::sync::Arc;

use clap::Parser;
use seedline_client::{Credentials, QbitClient, SessionContext};
use seedline_config::ClientConfig;
use seedline_state::{
    Dispatcher, OpenPolicy, StateStore, SyncPolicy, Synchronizer, SystemOpener,
};
use seedline_telemetry::{GlobalContextGuard, LoggingConfig, init_logging};
use seedline_torrent_core::{Item, RemoteControl};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::ui::{self, UiContext};

/// Level used when logs can only go to stderr, which the interface shares.
const STDERR_LOG_LEVEL: &str = "warn";

/// Parse the command line, run the client, and return the process exit status.
pub async fn run() -> i32 {
    match run_with(Cli::parse()).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

/// Run the client with already parsed flags.
///
/// # Errors
///
/// Returns an [`AppError`] when configuration, logging, the startup session, or
/// the terminal fails.
pub async fn run_with(cli: Cli) -> AppResult<()> {
    let config = seedline_config::load(cli.config.as_deref(), cli.overlay())
        .map_err(|err| AppError::config("config.load", err))?;

    let level = if config.log_dir.is_some() {
        config.log_level.as_str()
    } else {
        STDERR_LOG_LEVEL
    };
    let _logging = init_logging(&LoggingConfig {
        level,
        format: config.log_format,
        build_sha: option_env!("SEEDLINE_BUILD_SHA").unwrap_or("dev"),
        log_dir: config.log_dir.as_deref(),
    })
    .map_err(|err| AppError::telemetry("telemetry.init", err))?;
    let _context = GlobalContextGuard::new(config.url.as_str());
    info!(?config, "seedline starting");

    let (client, initial) = match start_session(&config).await {
        Ok(started) => started,
        Err(err) => {
            error!(error = %err.display_message(), "startup failed");
            return Err(err);
        }
    };

    let store = Arc::new(StateStore::new(config.pending_ttl));
    let report = store.commit(initial);
    info!(items = store.read().len(), generation = report.generation, "initial snapshot committed");

    let remote: Arc<dyn RemoteControl> = client.clone();
    let sync = Synchronizer::new(
        Arc::clone(&remote),
        Arc::clone(&store),
        SyncPolicy {
            poll_interval: config.poll_interval,
            degraded_threshold: config.degraded_threshold,
        },
    )
    .spawn();

    let (notice_tx, notice_rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(
        remote,
        Arc::clone(&store),
        Arc::new(SystemOpener),
        open_policy(&config),
        notice_tx,
    );

    let outcome = ui::run(UiContext {
        daemon: config.url.as_str(),
        store: &store,
        dispatcher: &dispatcher,
        sync: &sync,
        notices: notice_rx,
    })
    .await
    .map_err(|err| AppError::terminal("ui.run", err));

    sync.shutdown();
    client.logout().await;
    info!("seedline stopped");
    outcome
}

/// Open the session and fetch the first listing.
pub(crate) async fn start_session(config: &ClientConfig) -> AppResult<(Arc<QbitClient>, Vec<Item>)> {
    let url = config.url.to_string();
    let credentials = config.credentials().map(|(username, password)| Credentials {
        username: username.to_string(),
        password: password.to_string(),
    });
    let session = SessionContext::new(
        config.url.clone(),
        credentials,
        config.request_timeout,
        config.accept_invalid_certs,
    )
    .map_err(|err| AppError::connect("startup.session", url.clone(), err))?;
    let client = Arc::new(QbitClient::new(session));

    if client.session().has_credentials() {
        client
            .login()
            .await
            .map_err(|err| AppError::connect("startup.login", url.clone(), err))?;
    }
    let items = client
        .list()
        .await
        .map_err(|err| AppError::connect("startup.list", url, err))?;
    Ok((client, items))
}

fn open_policy(config: &ClientConfig) -> OpenPolicy {
    OpenPolicy {
        remote_mode: config.remote_mode,
        rewrites: config
            .path_rewrites
            .iter()
            .map(|rewrite| (rewrite.from.clone(), rewrite.to.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use anyhow::Result;
    use httpmock::prelude::*;
    use seedline_config::{ConfigOverlay, PathRewrite};
    use serde_json::json;

    use super::*;
    use crate::error::EXIT_FAILURE;

    fn config_for(url: &str, credentials: bool) -> Result<ClientConfig> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("config.yaml");
        fs::write(&file, "request_timeout: 2\n")?;
        let overlay = ConfigOverlay {
            url: Some(url.to_string()),
            username: credentials.then(|| "admin".to_string()),
            password: credentials.then(|| "adminadmin".to_string()),
            ..ConfigOverlay::default()
        };
        Ok(seedline_config::load(Some(&file), overlay)?)
    }

    #[tokio::test]
    async fn startup_logs_in_and_fetches_the_listing() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).header("set-cookie", "SID=abc").body("Ok.");
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .header("cookie", "SID=abc");
            then.status(200).json_body(json!([
                {"hash": "a", "name": "alpha", "state": "pausedDL", "progress": 0.4}
            ]));
        });

        let (_client, items) = start_session(&config_for(&server.base_url(), true)?).await?;
        login.assert();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "alpha");
        Ok(())
    }

    #[tokio::test]
    async fn wrong_credentials_are_fatal_with_status_one() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });
        let listing = server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200).json_body(json!([]));
        });

        let Err(err) = start_session(&config_for(&server.base_url(), true)?).await else {
            anyhow::bail!("expected login failure");
        };
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert!(err.display_message().contains(&server.base_url()));
        assert!(err.display_message().contains("check credentials"));
        listing.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_daemon_fails_the_first_listing() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(503);
        });

        let Err(err) = start_session(&config_for(&server.base_url(), false)?).await else {
            anyhow::bail!("expected listing failure");
        };
        assert!(matches!(
            err,
            AppError::Connect {
                operation: "startup.list",
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn rewrites_are_forwarded_to_the_open_policy() -> Result<()> {
        let mut config = config_for("http://127.0.0.1:8080", false)?;
        config.remote_mode = true;
        config.path_rewrites = vec![PathRewrite {
            from: PathBuf::from("/downloads"),
            to: PathBuf::from("/mnt/nas"),
        }];
        let policy = open_policy(&config);
        assert!(policy.remote_mode);
        assert_eq!(
            policy.rewrite(std::path::Path::new("/downloads/a.iso")),
            PathBuf::from("/mnt/nas/a.iso")
        );
        Ok(())
    }
}
