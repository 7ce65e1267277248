//! Core torrent domain types shared across the workspace.

use std::fmt::{self, Display, Formatter};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Opaque identifier assigned to an item by the remote daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Wrap a daemon-assigned identifier.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the identifier as sent over the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lifecycle status displayed for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for a slot in the daemon's queue.
    Queued,
    /// Actively downloading (including metadata fetch and checking).
    Downloading,
    /// Stopped before completion.
    Paused,
    /// Complete and uploading to peers.
    Seeding,
    /// Complete and stopped.
    Completed,
    /// The daemon reported a failure for this item.
    Error,
    /// Deletion was requested locally; the daemon has not confirmed it yet.
    RemovedPending,
}

impl ItemStatus {
    /// Whether the daemon is (or will be) transferring data for this item.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Queued | Self::Downloading | Self::Seeding)
    }

    /// Short label used by renderers and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Paused => "paused",
            Self::Seeding => "seeding",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::RemovedPending => "removing",
        }
    }
}

impl Display for ItemStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.label())
    }
}

/// Transfer rates reported for an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRates {
    #[serde(default)]
    /// Current download rate in bytes per second.
    pub download_bps: u64,
    #[serde(default)]
    /// Current upload rate in bytes per second.
    pub upload_bps: u64,
}

/// One tracked download unit with remote-assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier assigned by the daemon; unique within a snapshot.
    pub id: ItemId,
    /// Display name.
    pub name: String,
    /// Current lifecycle status.
    pub status: ItemStatus,
    /// Completion ratio in `[0.0, 1.0]`.
    pub progress: f64,
    /// Filesystem location of the payload once the daemon knows it.
    pub content_path: Option<PathBuf>,
    /// Last error reported by the daemon, if any.
    pub last_error: Option<String>,
    /// Total payload size in bytes.
    #[serde(default)]
    pub size_bytes: u64,
    /// Current transfer rates.
    #[serde(default)]
    pub rates: ItemRates,
    /// Estimated seconds to completion when the daemon can tell.
    pub eta_seconds: Option<u64>,
    /// Daemon-side category label.
    pub category: Option<String>,
    /// Directory the daemon saves the payload into.
    pub save_path: Option<String>,
}

impl Item {
    /// Construct an item with neutral defaults for the optional fields.
    #[must_use]
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, status: ItemStatus) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status,
            progress: 0.0,
            content_path: None,
            last_error: None,
            size_bytes: 0,
            rates: ItemRates::default(),
            eta_seconds: None,
            category: None,
            save_path: None,
        }
    }

    /// Set the completion ratio, clamped into `[0.0, 1.0]`.
    #[must_use]
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = clamp_ratio(progress);
        self
    }

    /// Set the content path.
    #[must_use]
    pub fn with_content_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_path = Some(path.into());
        self
    }

    /// Whether the payload has been fully downloaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

/// One file inside an item's payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFile {
    /// Position of the file within the item.
    pub index: u32,
    /// Path relative to the item's save directory.
    pub name: String,
    /// File size in bytes.
    #[serde(default)]
    pub size_bytes: u64,
    /// Completion ratio in `[0.0, 1.0]`.
    pub progress: f64,
}

impl ItemFile {
    /// Whether every piece of the file has been downloaded.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Clamp a reported ratio into `[0.0, 1.0]`; non-finite values become `0.0`.
#[must_use]
pub fn clamp_ratio(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Options controlling how the daemon removes an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    #[serde(default)]
    /// Whether to remove on-disk data alongside the item.
    pub delete_files: bool,
}

/// Acknowledgement returned by control operations that carry no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_statuses_are_classified() {
        assert!(ItemStatus::Downloading.is_running());
        assert!(ItemStatus::Queued.is_running());
        assert!(ItemStatus::Seeding.is_running());
        assert!(!ItemStatus::Paused.is_running());
        assert!(!ItemStatus::Completed.is_running());
        assert!(!ItemStatus::RemovedPending.is_running());
    }

    #[test]
    fn progress_is_clamped_and_sanitised() {
        let item = Item::new("a", "demo", ItemStatus::Downloading).with_progress(1.7);
        assert!((item.progress - 1.0).abs() < f64::EPSILON);
        assert!(item.is_complete());

        let item = Item::new("a", "demo", ItemStatus::Downloading).with_progress(f64::NAN);
        assert!(item.progress.abs() < f64::EPSILON);
        assert!(!item.is_complete());

        assert!(clamp_ratio(-0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn item_id_serialises_transparently() {
        let id = ItemId::new("8c2f");
        let encoded = serde_json::to_string(&id).expect("serialise id");
        assert_eq!(encoded, "\"8c2f\"");
        assert_eq!(id.to_string(), "8c2f");
    }

    #[test]
    fn file_completion_follows_progress() {
        let mut file = ItemFile {
            index: 0,
            name: "disc/track01.flac".into(),
            size_bytes: 10,
            progress: 0.99,
        };
        assert!(!file.is_complete());
        file.progress = 1.0;
        assert!(file.is_complete());
    }

    #[test]
    fn status_labels_are_stable() {
        assert_eq!(ItemStatus::RemovedPending.to_string(), "removing");
        assert_eq!(ItemStatus::Paused.label(), "paused");
    }
}
