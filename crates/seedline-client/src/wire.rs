//! WebUI response rows and the mapping onto the shared item model.

use std::collections::HashSet;
use std::path::PathBuf;

use seedline_torrent_core::{Item, ItemFile, ItemId, ItemRates, ItemStatus, clamp_ratio};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// ETA value the daemon reports for "unknown / never".
pub(crate) const INFINITE_ETA: i64 = 8_640_000;

/// One entry of `torrents/info`.
#[derive(Debug, Deserialize)]
pub(crate) struct TorrentRow {
    pub(crate) hash: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) state: String,
    #[serde(default)]
    pub(crate) progress: f64,
    #[serde(default)]
    pub(crate) content_path: String,
    #[serde(default)]
    pub(crate) save_path: String,
    #[serde(default)]
    pub(crate) size: i64,
    #[serde(default)]
    pub(crate) dlspeed: i64,
    #[serde(default)]
    pub(crate) upspeed: i64,
    #[serde(default = "unknown_eta")]
    pub(crate) eta: i64,
    #[serde(default)]
    pub(crate) category: String,
}

const fn unknown_eta() -> i64 {
    INFINITE_ETA
}

impl TorrentRow {
    /// Convert into an item; rows without an identifier are dropped.
    pub(crate) fn into_item(self) -> Option<Item> {
        let hash = self.hash.trim();
        if hash.is_empty() {
            return None;
        }
        let (status, last_error) = map_state(&self.state);
        Some(Item {
            id: ItemId::new(hash),
            name: self.name,
            status,
            progress: clamp_ratio(self.progress),
            content_path: non_empty(self.content_path).map(PathBuf::from),
            last_error,
            size_bytes: non_negative(self.size),
            rates: ItemRates {
                download_bps: non_negative(self.dlspeed),
                upload_bps: non_negative(self.upspeed),
            },
            eta_seconds: (0..INFINITE_ETA)
                .contains(&self.eta)
                .then(|| non_negative(self.eta)),
            category: non_empty(self.category),
            save_path: non_empty(self.save_path),
        })
    }
}

/// One entry of `torrents/files`.
#[derive(Debug, Deserialize)]
pub(crate) struct FileRow {
    #[serde(default)]
    pub(crate) index: Option<u32>,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) size: i64,
    #[serde(default)]
    pub(crate) progress: f64,
}

/// Decode a `torrents/files` array; entries without a name are skipped.
///
/// Daemons that omit `index` number the files by position.
pub(crate) fn decode_files(values: Vec<Value>) -> Vec<ItemFile> {
    let mut files = Vec::with_capacity(values.len());
    for (position, value) in values.into_iter().enumerate() {
        let row = match serde_json::from_value::<FileRow>(value) {
            Ok(row) if !row.name.trim().is_empty() => row,
            Ok(_) => {
                warn!(index = position, "skipping file entry without a name");
                continue;
            }
            Err(err) => {
                warn!(index = position, error = %err, "skipping malformed file entry");
                continue;
            }
        };
        files.push(ItemFile {
            index: row
                .index
                .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX)),
            name: row.name,
            size_bytes: non_negative(row.size),
            progress: clamp_ratio(row.progress),
        });
    }
    files
}

/// Map a daemon state string onto the displayed status and an optional error text.
pub(crate) fn map_state(raw: &str) -> (ItemStatus, Option<String>) {
    match raw {
        "downloading" | "forcedDL" | "metaDL" | "forcedMetaDL" | "stalledDL" | "checkingDL"
        | "allocating" => (ItemStatus::Downloading, None),
        "uploading" | "forcedUP" | "stalledUP" | "checkingUP" => (ItemStatus::Seeding, None),
        "queuedDL" | "queuedUP" | "checkingResumeData" | "moving" => (ItemStatus::Queued, None),
        "pausedDL" | "stoppedDL" => (ItemStatus::Paused, None),
        "pausedUP" | "stoppedUP" => (ItemStatus::Completed, None),
        "missingFiles" => (ItemStatus::Error, Some("files are missing".to_string())),
        "error" => (ItemStatus::Error, Some("daemon reported an error".to_string())),
        other => (
            ItemStatus::Error,
            Some(format!("unrecognised daemon state '{other}'")),
        ),
    }
}

/// Decode a `torrents/info` array entry by entry.
///
/// A malformed entry or a repeated identifier is skipped with a warning so the
/// rest of the list still reaches reconciliation.
pub(crate) fn decode_items(values: Vec<Value>) -> Vec<Item> {
    let mut seen = HashSet::with_capacity(values.len());
    let mut items = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        let row = match serde_json::from_value::<TorrentRow>(value) {
            Ok(row) => row,
            Err(err) => {
                warn!(index, error = %err, "skipping malformed torrent entry");
                continue;
            }
        };
        let Some(item) = row.into_item() else {
            warn!(index, "skipping torrent entry without a hash");
            continue;
        };
        if !seen.insert(item.id.clone()) {
            warn!(index, item_id = %item.id, "skipping duplicate torrent entry");
            continue;
        }
        items.push(item);
    }
    items
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn states_map_onto_displayed_statuses() {
        assert_eq!(map_state("stalledDL").0, ItemStatus::Downloading);
        assert_eq!(map_state("forcedUP").0, ItemStatus::Seeding);
        assert_eq!(map_state("queuedDL").0, ItemStatus::Queued);
        assert_eq!(map_state("pausedDL").0, ItemStatus::Paused);
        assert_eq!(map_state("stoppedDL").0, ItemStatus::Paused);
        assert_eq!(map_state("pausedUP").0, ItemStatus::Completed);

        let (status, error) = map_state("missingFiles");
        assert_eq!(status, ItemStatus::Error);
        assert_eq!(error.as_deref(), Some("files are missing"));

        let (status, error) = map_state("weird");
        assert_eq!(status, ItemStatus::Error);
        assert!(error.is_some_and(|text| text.contains("weird")));
    }

    #[test]
    fn decode_skips_bad_entries_and_keeps_the_rest() {
        let items = decode_items(vec![
            json!({"hash": "a", "name": "alpha", "state": "downloading", "progress": 0.4,
                   "size": 2048, "dlspeed": 512, "upspeed": -1, "eta": 90,
                   "content_path": "/dl/alpha", "category": ""}),
            json!({"name": "no hash"}),
            json!({"hash": "", "name": "blank"}),
            json!({"hash": "b", "progress": "not a number"}),
            json!({"hash": "a", "name": "dupe"}),
            json!({"hash": "c", "name": "gamma", "state": "pausedUP", "progress": 1.0,
                   "eta": 8_640_000}),
        ]);

        assert_eq!(items.len(), 2);
        let alpha = &items[0];
        assert_eq!(alpha.id.as_str(), "a");
        assert_eq!(alpha.name, "alpha");
        assert_eq!(alpha.status, ItemStatus::Downloading);
        assert!((alpha.progress - 0.4).abs() < f64::EPSILON);
        assert_eq!(alpha.size_bytes, 2048);
        assert_eq!(alpha.rates.download_bps, 512);
        assert_eq!(alpha.rates.upload_bps, 0);
        assert_eq!(alpha.eta_seconds, Some(90));
        assert_eq!(alpha.content_path, Some(PathBuf::from("/dl/alpha")));
        assert!(alpha.category.is_none());

        let gamma = &items[1];
        assert_eq!(gamma.status, ItemStatus::Completed);
        assert!(gamma.eta_seconds.is_none());
        assert!(gamma.content_path.is_none());
    }

    #[test]
    fn file_rows_keep_relative_names() {
        let files = decode_files(vec![
            json!({"index": 0, "name": "album/01.flac", "size": 4096, "progress": 1.0}),
            json!({"name": ""}),
            json!({"size": 3}),
            json!({"name": "album/cover.jpg", "size": -1, "progress": 1.5}),
        ]);
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "album/01.flac");
        assert_eq!(files[0].size_bytes, 4096);
        assert_eq!(files[1].index, 3);
        assert_eq!(files[1].size_bytes, 0);
        assert!(files[1].is_complete());
    }
}
