//! Optimistic action records tracked per item.

use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Utc};
use seedline_torrent_core::{Item, ItemId, ItemStatus};
use tokio::time::Instant;

/// Commands that change an item's status optimistically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Stop transferring.
    Pause,
    /// Start transferring again.
    Resume,
    /// Remove from the daemon.
    Delete {
        /// Whether the payload is removed from disk too.
        delete_files: bool,
    },
}

impl ActionKind {
    /// Operation label used in logs and errors.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Delete { .. } => "delete",
        }
    }

    /// Status displayed while the action is pending for `current`.
    #[must_use]
    pub fn predicted_status(self, current: &Item) -> ItemStatus {
        match self {
            Self::Pause => ItemStatus::Paused,
            Self::Resume if current.is_complete() => ItemStatus::Seeding,
            Self::Resume => ItemStatus::Downloading,
            Self::Delete { .. } => ItemStatus::RemovedPending,
        }
    }

    /// Whether the remote status (`None` when the id is gone) already reflects
    /// or supersedes this action.
    #[must_use]
    pub const fn is_settled_by(self, remote: Option<ItemStatus>) -> bool {
        match (self, remote) {
            (Self::Delete { .. }, remote) => remote.is_none(),
            (_, None) => false,
            (
                Self::Pause,
                Some(ItemStatus::Paused | ItemStatus::Completed | ItemStatus::Error),
            )
            | (
                Self::Resume,
                Some(
                    ItemStatus::Queued
                    | ItemStatus::Downloading
                    | ItemStatus::Seeding
                    | ItemStatus::Error,
                ),
            ) => true,
            _ => false,
        }
    }

    pub(crate) const fn is_delete(self) -> bool {
        matches!(self, Self::Delete { .. })
    }
}

impl Display for ActionKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.operation())
    }
}

/// Identifies one optimistic override in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionToken(pub(crate) u64);

impl Display for ActionToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "#{}", self.0)
    }
}

/// Where a pending action stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    /// The remote call is still running.
    Issued,
    /// The daemon accepted the call; waiting for the remote state to converge.
    Confirmed {
        /// When the daemon acknowledged the call.
        at: Instant,
    },
}

/// Terminal result of resolving a pending action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The daemon accepted the command.
    Confirmed,
    /// The override was reverted after a failure.
    RolledBack,
    /// Reconciliation already resolved the override; nothing changed.
    Superseded,
}

/// In-flight record of one dispatched command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    /// Store token of the override.
    pub token: ActionToken,
    /// Target item.
    pub item_id: ItemId,
    /// Command kind.
    pub kind: ActionKind,
    /// Wall-clock time the command was issued.
    pub issued_at: DateTime<Utc>,
    /// Status displayed while pending.
    pub optimistic: ItemStatus,
    /// Lifecycle phase.
    pub phase: ActionPhase,
}

impl PendingAction {
    pub(crate) fn issue(token: ActionToken, target: &Item, kind: ActionKind) -> Self {
        Self {
            token,
            item_id: target.id.clone(),
            kind,
            issued_at: Utc::now(),
            optimistic: kind.predicted_status(target),
            phase: ActionPhase::Issued,
        }
    }

    /// Whether the remote call is still running.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self.phase, ActionPhase::Issued)
    }

    /// Whether a new command for the same item must be refused.
    ///
    /// A confirmed removal stays exclusive until reconciliation purges the id.
    #[must_use]
    pub const fn blocks_new_commands(&self) -> bool {
        self.is_in_flight() || self.kind.is_delete()
    }
}
