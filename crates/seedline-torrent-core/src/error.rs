//! Error taxonomy for remote control operations.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

/// Why authentication against the daemon could not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    /// The daemon refused the configured username/password.
    WrongCredentials,
    /// The daemon has temporarily banned this client after failed logins.
    TooManyAttempts,
    /// The session expired and logging in again did not restore access.
    SessionNotRenewed,
    /// The daemon requires a session but no credentials were configured.
    CredentialsRequired,
}

impl Display for AuthFailureReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::WrongCredentials => "check credentials",
            Self::TooManyAttempts => "too many failed login attempts",
            Self::SessionNotRenewed => "session could not be renewed",
            Self::CredentialsRequired => "authentication is required",
        })
    }
}

/// Primary error type for remote control operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network failure, timeout, server-side failure, or undecodable response.
    #[error("{operation} failed: {detail}")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Human-readable failure detail.
        detail: String,
        /// Whether the bounded request timeout expired.
        timed_out: bool,
    },
    /// The daemon understood an authenticated request and refused it.
    #[error("{operation} rejected: {reason}")]
    Rejected {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status code when the refusal came from a response status.
        status: Option<u16>,
        /// Human-readable refusal reason.
        reason: String,
    },
    /// Authentication cannot succeed.
    #[error("authentication failed: {reason}")]
    AuthFailure {
        /// Machine-readable failure reason.
        reason: AuthFailureReason,
    },
}

impl RemoteError {
    /// Build a transport error.
    pub fn transport(operation: &'static str, detail: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            detail: detail.into(),
            timed_out: false,
        }
    }

    /// Build a transport error for an expired request timeout.
    pub fn timeout(operation: &'static str) -> Self {
        Self::Transport {
            operation,
            detail: "request timed out".to_string(),
            timed_out: true,
        }
    }

    /// Build a rejection error.
    pub fn rejected(operation: &'static str, status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            status,
            reason: reason.into(),
        }
    }

    /// Whether the failure is transient and may succeed on a later attempt.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Convenience alias for remote control results.
pub type RemoteResult<T> = Result<T, RemoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = RemoteError::rejected("pause", Some(409), "torrent is checking");
        assert_eq!(err.to_string(), "pause rejected: torrent is checking");
        assert!(!err.is_transient());

        let err = RemoteError::timeout("list");
        assert_eq!(err.to_string(), "list failed: request timed out");
        assert!(err.is_transient());
        assert!(matches!(err, RemoteError::Transport { timed_out: true, .. }));

        let err = RemoteError::AuthFailure {
            reason: AuthFailureReason::WrongCredentials,
        };
        assert_eq!(err.to_string(), "authentication failed: check credentials");
    }
}
