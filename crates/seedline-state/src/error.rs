//! Failures surfaced to the operator for a single command.

use seedline_torrent_core::{ItemId, RemoteError};
use thiserror::Error;

/// Why a command could not be carried out.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The item is not part of the current snapshot.
    #[error("unknown item {id}")]
    UnknownItem {
        /// Requested item.
        id: ItemId,
    },
    /// Another command for the same item has not resolved yet.
    #[error("an action is already in progress for {id}")]
    ActionInProgress {
        /// Requested item.
        id: ItemId,
    },
    /// The payload cannot be opened (incomplete, missing locally, or opener failure).
    #[error("content of {id} is unavailable: {reason}")]
    ContentUnavailable {
        /// Requested item.
        id: ItemId,
        /// Human-readable reason.
        reason: String,
    },
    /// Opening files is disabled because the daemon runs on another host.
    #[error("opening files is disabled in remote mode")]
    OpenDisabled,
    /// The daemon call behind the command failed.
    #[error("{operation} {id}: {source}")]
    Remote {
        /// Operation identifier.
        operation: &'static str,
        /// Target item.
        id: ItemId,
        /// Underlying remote failure.
        #[source]
        source: RemoteError,
    },
}

impl DispatchError {
    pub(crate) fn content_unavailable(id: &ItemId, reason: impl Into<String>) -> Self {
        Self::ContentUnavailable {
            id: id.clone(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for dispatcher results.
pub type DispatchResult<T> = Result<T, DispatchError>;
