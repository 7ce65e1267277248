//! Connection target, credentials, and session renewal state for one daemon.

use std::fmt::{self, Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use seedline_torrent_core::{RemoteError, RemoteResult};
use tokio::sync::Mutex;
use url::Url;

/// Path prefix of the WebUI API relative to the connection target.
pub(crate) const API_PREFIX: &str = "api/v2/";

/// Username/password pair used to open a WebUI session.
#[derive(Clone)]
pub struct Credentials {
    /// WebUI username.
    pub username: String,
    /// WebUI password.
    pub password: String,
}

impl Debug for Credentials {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Explicit context owning the HTTP client, connection target, and session.
///
/// The session cookie lives in the HTTP client's cookie jar, whatever name the
/// daemon gives it (`SID`, `QBT_SID_<port>`). `epoch` counts renewals so
/// concurrent callers that observe the same expiry only log in once.
pub struct SessionContext {
    pub(crate) http: Client,
    pub(crate) base_url: Url,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) renewal: Mutex<()>,
    epoch: AtomicU64,
}

impl SessionContext {
    /// Build a session context for the given connection target.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Transport`] when the HTTP client cannot be built.
    pub fn new(
        base_url: Url,
        credentials: Option<Credentials>,
        request_timeout: Duration,
        accept_invalid_certs: bool,
    ) -> RemoteResult<Self> {
        let http = Client::builder()
            .timeout(request_timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|err| {
                RemoteError::transport("session.new", format!("failed to build HTTP client: {err}"))
            })?;

        Ok(Self::with_client(http, base_url, credentials))
    }

    /// Build a session context around an existing HTTP client. The client must
    /// keep a cookie store for the session to survive between calls.
    #[must_use]
    pub fn with_client(http: Client, base_url: Url, credentials: Option<Credentials>) -> Self {
        Self {
            http,
            base_url: normalize_base(base_url),
            credentials,
            renewal: Mutex::new(()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Connection target with a trailing slash.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether a username/password pair is available for (re-)authentication.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Resolve an API path such as `torrents/info` against the connection target.
    pub(crate) fn endpoint(&self, operation: &'static str, path: &str) -> RemoteResult<Url> {
        self.base_url
            .join(API_PREFIX)
            .and_then(|api| api.join(path))
            .map_err(|err| RemoteError::transport(operation, format!("invalid endpoint URL: {err}")))
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn advance_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }
}

impl Debug for SessionContext {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SessionContext")
            .field("base_url", &self.base_url.as_str())
            .field("credentials", &self.credentials)
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
