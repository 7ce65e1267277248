//! `RemoteControl` implementation for the qBittorrent WebUI API.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::REFERER;
use reqwest::{Method, Response, StatusCode};
use seedline_torrent_core::{
    Ack, AuthFailureReason, Item, ItemFile, ItemId, RemoteControl, RemoteError, RemoteResult,
    RemoveOptions,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::session::SessionContext;
use crate::wire::{TorrentRow, decode_files, decode_items};

/// Timeout applied to the best-effort logout issued during shutdown.
const LOGOUT_TIMEOUT: Duration = Duration::from_millis(500);

/// One request against the WebUI API.
struct Call<'a> {
    operation: &'static str,
    method: Method,
    path: &'a str,
    params: &'a [(&'a str, &'a str)],
}

impl<'a> Call<'a> {
    fn get(operation: &'static str, path: &'a str, params: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            operation,
            method: Method::GET,
            path,
            params,
        }
    }

    fn post(
        operation: &'static str,
        path: &'a str,
        params: &'a [(&'a str, &'a str)],
    ) -> Self {
        Self {
            operation,
            method: Method::POST,
            path,
            params,
        }
    }
}

/// HTTP client for a single daemon, holding one authenticated session.
///
/// A `403` on any call is treated as session expiry: the client logs in again
/// once and retries that call exactly once before failing.
#[derive(Debug)]
pub struct QbitClient {
    session: SessionContext,
    start_stop_endpoints: AtomicBool,
}

impl QbitClient {
    /// Wrap a session context.
    #[must_use]
    pub const fn new(session: SessionContext) -> Self {
        Self {
            session,
            start_stop_endpoints: AtomicBool::new(false),
        }
    }

    /// Access the underlying session context.
    #[must_use]
    pub const fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Open a session with the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::AuthFailure`] when the daemon refuses the
    /// credentials or has banned the client, and [`RemoteError::Transport`] when
    /// it cannot be reached.
    pub async fn login(&self) -> RemoteResult<()> {
        let operation = "login";
        let Some(credentials) = self.session.credentials.as_ref() else {
            return Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::CredentialsRequired,
            });
        };
        let url = self.session.endpoint(operation, "auth/login")?;
        let response = self
            .session
            .http
            .post(url)
            .header(REFERER, self.session.base_url.as_str())
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|err| transport_error(operation, &err))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::TooManyAttempts,
            });
        }
        let response = check_status(operation, response).await?;
        let body = response
            .text()
            .await
            .map_err(|err| transport_error(operation, &err))?;

        match body.trim() {
            "Ok." => {
                info!(username = %credentials.username, "webui session opened");
                Ok(())
            }
            "Fails." => Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::WrongCredentials,
            }),
            other => Err(RemoteError::rejected(
                operation,
                Some(status.as_u16()),
                format!("unexpected login response '{other}'"),
            )),
        }
    }

    /// Close the session; failures are logged and ignored.
    pub async fn logout(&self) {
        let Ok(url) = self.session.endpoint("logout", "auth/logout") else {
            return;
        };
        match self
            .session
            .http
            .post(url)
            .timeout(LOGOUT_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => debug!(status = %response.status(), "webui session closed"),
            Err(err) => debug!(error = %err, "logout failed"),
        }
    }

    async fn send_once(&self, call: &Call<'_>) -> RemoteResult<Response> {
        let url = self.session.endpoint(call.operation, call.path)?;
        let mut request = self.session.http.request(call.method.clone(), url);
        request = if call.method == Method::GET {
            request.query(call.params)
        } else {
            request.form(call.params)
        };
        request
            .send()
            .await
            .map_err(|err| transport_error(call.operation, &err))
    }

    async fn execute(&self, call: &Call<'_>) -> RemoteResult<Response> {
        let observed_epoch = self.session.epoch();
        let response = self.send_once(call).await?;
        if response.status() != StatusCode::FORBIDDEN {
            return check_status(call.operation, response).await;
        }
        if !self.session.has_credentials() {
            return Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::CredentialsRequired,
            });
        }

        debug!(operation = call.operation, "session expired; logging in again");
        self.renew_session(observed_epoch).await?;

        let response = self.send_once(call).await?;
        if response.status() == StatusCode::FORBIDDEN {
            warn!(operation = call.operation, "renewed session was refused");
            return Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::SessionNotRenewed,
            });
        }
        check_status(call.operation, response).await
    }

    async fn renew_session(&self, observed_epoch: u64) -> RemoteResult<()> {
        let _guard = self.session.renewal.lock().await;
        if self.session.epoch() != observed_epoch {
            return Ok(());
        }
        self.login().await?;
        self.session.advance_epoch();
        Ok(())
    }

    async fn fetch_rows(&self, call: &Call<'_>) -> RemoteResult<Vec<Value>> {
        self.execute(call)
            .await?
            .json::<Vec<Value>>()
            .await
            .map_err(|err| {
                RemoteError::transport(call.operation, format!("invalid response body: {err}"))
            })
    }

    async fn start_or_stop(
        &self,
        operation: &'static str,
        id: &ItemId,
        legacy_path: &str,
        current_path: &str,
    ) -> RemoteResult<Ack> {
        let params = [("hashes", id.as_str())];
        if !self.start_stop_endpoints.load(Ordering::Acquire) {
            match self.execute(&Call::post(operation, legacy_path, &params)).await {
                Err(RemoteError::Rejected {
                    status: Some(404), ..
                }) => {
                    info!(
                        endpoint = current_path,
                        "daemon lacks {legacy_path}; switching to start/stop endpoints"
                    );
                    self.start_stop_endpoints.store(true, Ordering::Release);
                }
                other => return other.map(|_| Ack),
            }
        }
        self.execute(&Call::post(operation, current_path, &params))
            .await
            .map(|_| Ack)
    }
}

#[async_trait]
impl RemoteControl for QbitClient {
    async fn list(&self) -> RemoteResult<Vec<Item>> {
        let rows = self
            .fetch_rows(&Call::get("list", "torrents/info", &[]))
            .await?;
        Ok(decode_items(rows))
    }

    async fn pause(&self, id: &ItemId) -> RemoteResult<Ack> {
        self.start_or_stop("pause", id, "torrents/pause", "torrents/stop")
            .await
    }

    async fn resume(&self, id: &ItemId) -> RemoteResult<Ack> {
        self.start_or_stop("resume", id, "torrents/resume", "torrents/start")
            .await
    }

    async fn remove(&self, id: &ItemId, options: RemoveOptions) -> RemoteResult<Ack> {
        let params = [
            ("hashes", id.as_str()),
            ("deleteFiles", if options.delete_files { "true" } else { "false" }),
        ];
        self.execute(&Call::post("remove", "torrents/delete", &params))
            .await
            .map(|_| Ack)
    }

    async fn content_path(&self, id: &ItemId) -> RemoteResult<PathBuf> {
        let operation = "content_path";
        let params = [("hashes", id.as_str())];
        let rows = self
            .fetch_rows(&Call::get(operation, "torrents/info", &params))
            .await?;
        let row = rows
            .into_iter()
            .filter_map(|value| serde_json::from_value::<TorrentRow>(value).ok())
            .find(|row| row.hash == id.as_str())
            .ok_or_else(|| RemoteError::rejected(operation, None, format!("{id} is not tracked")))?;

        if row.content_path.trim().is_empty() {
            return Err(RemoteError::rejected(
                operation,
                None,
                "daemon has not reported a content path",
            ));
        }
        Ok(PathBuf::from(row.content_path))
    }

    async fn files(&self, id: &ItemId) -> RemoteResult<Vec<ItemFile>> {
        let params = [("hash", id.as_str())];
        let rows = self
            .fetch_rows(&Call::get("files", "torrents/files", &params))
            .await?;
        Ok(decode_files(rows))
    }
}

fn transport_error(operation: &'static str, err: &reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::timeout(operation)
    } else {
        RemoteError::transport(operation, err.to_string())
    }
}

/// Classify a response: `5xx` is transient, any other non-success is a refusal.
async fn check_status(operation: &'static str, response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_server_error() {
        return Err(RemoteError::transport(
            operation,
            format!("daemon returned {status}"),
        ));
    }

    let body = response.text().await.unwrap_or_default();
    let reason = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request refused")
            .to_string()
    } else {
        body.trim().to_string()
    };
    Err(RemoteError::rejected(operation, Some(status.as_u16()), reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Credentials;
    use anyhow::Result;
    use httpmock::MockServer;
    use httpmock::prelude::*;
    use reqwest::Client;
    use seedline_torrent_core::ItemStatus;
    use serde_json::json;

    fn client_for(server: &MockServer, credentials: Option<Credentials>) -> Result<QbitClient> {
        let session = SessionContext::new(
            server.base_url().parse()?,
            credentials,
            Duration::from_secs(2),
            false,
        )?;
        Ok(QbitClient::new(session))
    }

    fn admin() -> Option<Credentials> {
        Some(Credentials {
            username: "admin".into(),
            password: "adminadmin".into(),
        })
    }

    #[tokio::test]
    async fn login_stores_session_cookie_for_later_calls() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/auth/login")
                .body("username=admin&password=adminadmin");
            then.status(200)
                .header("set-cookie", "SID=fresh; HttpOnly; path=/")
                .body("Ok.");
        });
        let info = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .header("cookie", "SID=fresh");
            then.status(200).json_body(json!([
                {"hash": "a", "name": "alpha", "state": "downloading", "progress": 0.4}
            ]));
        });

        let client = client_for(&server, admin())?;
        client.login().await?;
        let items = client.list().await?;

        login.assert();
        info.assert();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, ItemStatus::Downloading);
        Ok(())
    }

    #[tokio::test]
    async fn port_scoped_session_cookie_is_kept() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200)
                .header("set-cookie", "QBT_SID_8080=xyz; HttpOnly; path=/; SameSite=Strict")
                .body("Ok.");
        });
        let info = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .header("cookie", "QBT_SID_8080=xyz");
            then.status(200).json_body(json!([]));
        });
        let refused = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .header_missing("cookie");
            then.status(403);
        });

        let client = client_for(&server, admin())?;
        client.login().await?;
        assert!(client.list().await?.is_empty());
        assert!(client.list().await?.is_empty());

        login.assert_hits(1);
        info.assert_hits(2);
        refused.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn login_reports_wrong_credentials_and_bans() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });
        let client = client_for(&server, admin())?;
        assert!(matches!(
            client.login().await,
            Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::WrongCredentials
            })
        ));

        let banned = MockServer::start_async().await;
        banned.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(403);
        });
        let client = client_for(&banned, admin())?;
        assert!(matches!(
            client.login().await,
            Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::TooManyAttempts
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn expired_session_is_renewed_once_and_call_retried() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).header("set-cookie", "SID=fresh").body("Ok.");
        });
        let stale = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/pause")
                .header_missing("cookie");
            then.status(403).body("Forbidden");
        });
        let fresh = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/pause")
                .header("cookie", "SID=fresh")
                .body("hashes=a");
            then.status(200);
        });

        let client = client_for(&server, admin())?;
        client.pause(&ItemId::new("a")).await?;

        stale.assert_hits(1);
        login.assert_hits(1);
        fresh.assert_hits(1);
        Ok(())
    }

    #[tokio::test]
    async fn renewal_is_attempted_only_once_per_call() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).header("set-cookie", "SID=fresh").body("Ok.");
        });
        let info = server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(403);
        });

        let client = client_for(&server, admin())?;
        let err = client.list().await.expect_err("list should fail");
        assert!(matches!(
            err,
            RemoteError::AuthFailure {
                reason: AuthFailureReason::SessionNotRenewed
            }
        ));
        login.assert_hits(1);
        info.assert_hits(2);
        Ok(())
    }

    #[tokio::test]
    async fn forbidden_without_credentials_requires_auth() -> Result<()> {
        let server = MockServer::start_async().await;
        let login = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Ok.");
        });
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(403);
        });

        let client = client_for(&server, None)?;
        assert!(matches!(
            client.list().await,
            Err(RemoteError::AuthFailure {
                reason: AuthFailureReason::CredentialsRequired
            })
        ));
        login.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn statuses_are_classified() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/resume");
            then.status(409).body("torrent is being checked");
        });
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/delete");
            then.status(500);
        });

        let client = client_for(&server, None)?;
        let id = ItemId::new("a");
        match client.resume(&id).await {
            Err(RemoteError::Rejected { status, reason, .. }) => {
                assert_eq!(status, Some(409));
                assert_eq!(reason, "torrent is being checked");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        let err = client
            .remove(&id, RemoveOptions::default())
            .await
            .expect_err("server error");
        assert!(err.is_transient());
        Ok(())
    }

    #[tokio::test]
    async fn slow_daemon_times_out_as_transport_error() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/torrents/info");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!([]));
        });
        let session = SessionContext::new(
            server.base_url().parse()?,
            None,
            Duration::from_millis(50),
            false,
        )?;
        let client = QbitClient::new(session);
        assert!(matches!(
            client.list().await,
            Err(RemoteError::Transport {
                timed_out: true,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn pause_falls_back_to_stop_endpoint() -> Result<()> {
        let server = MockServer::start_async().await;
        let legacy = server.mock(|when, then| {
            when.method(POST).path("/api/v2/torrents/pause");
            then.status(404);
        });
        let stop = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/stop")
                .body("hashes=a");
            then.status(200);
        });

        let client = client_for(&server, None)?;
        client.pause(&ItemId::new("a")).await?;
        client.pause(&ItemId::new("a")).await?;

        legacy.assert_hits(1);
        stop.assert_hits(2);
        Ok(())
    }

    #[tokio::test]
    async fn remove_sends_delete_files_flag() -> Result<()> {
        let server = MockServer::start_async().await;
        let delete = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/torrents/delete")
                .body("hashes=a&deleteFiles=true");
            then.status(200);
        });
        let client = client_for(&server, None)?;
        client
            .remove(&ItemId::new("a"), RemoveOptions { delete_files: true })
            .await?;
        delete.assert();
        Ok(())
    }

    #[tokio::test]
    async fn content_path_is_reported_whatever_the_progress() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("hashes", "done");
            then.status(200).json_body(json!([
                {"hash": "done", "progress": 1.0, "content_path": "/dl/done.mkv"}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("hashes", "partial");
            then.status(200).json_body(json!([
                {"hash": "partial", "progress": 0.5, "content_path": "/dl/partial"}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("hashes", "fresh");
            then.status(200).json_body(json!([
                {"hash": "fresh", "progress": 0.0, "content_path": ""}
            ]));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/info")
                .query_param("hashes", "gone");
            then.status(200).json_body(json!([]));
        });

        let client = client_for(&server, None)?;
        assert_eq!(
            client.content_path(&ItemId::new("done")).await?,
            PathBuf::from("/dl/done.mkv")
        );
        assert_eq!(
            client.content_path(&ItemId::new("partial")).await?,
            PathBuf::from("/dl/partial")
        );
        assert!(matches!(
            client.content_path(&ItemId::new("fresh")).await,
            Err(RemoteError::Rejected { .. })
        ));
        assert!(matches!(
            client.content_path(&ItemId::new("gone")).await,
            Err(RemoteError::Rejected { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn files_are_listed_by_hash() -> Result<()> {
        let server = MockServer::start_async().await;
        let files = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/torrents/files")
                .query_param("hash", "a");
            then.status(200).json_body(json!([
                {"index": 0, "name": "album/01.flac", "size": 4096, "progress": 1.0},
                {"index": 1, "name": "album/02.flac", "size": 4096, "progress": 0.25}
            ]));
        });

        let client = client_for(&server, None)?;
        let listed = client.files(&ItemId::new("a")).await?;
        files.assert();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].name, "album/02.flac");
        assert!(!listed[1].is_complete());
        Ok(())
    }

    #[tokio::test]
    async fn logout_is_best_effort() -> Result<()> {
        let server = MockServer::start_async().await;
        let logout = server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/logout");
            then.status(200);
        });
        let session = SessionContext::with_client(Client::new(), server.base_url().parse()?, None);
        let client = QbitClient::new(session);
        client.logout().await;
        logout.assert();

        let unreachable = SessionContext::with_client(
            Client::new(),
            "http://127.0.0.1:9".parse()?,
            None,
        );
        QbitClient::new(unreachable).logout().await;
        Ok(())
    }
}
