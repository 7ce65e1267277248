//! Remote control contract implemented by daemon adapters.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{RemoteError, RemoteResult};
use crate::model::{Ack, Item, ItemFile, ItemId, RemoveOptions};

/// Typed operations against the daemon's control surface.
///
/// Every call is bounded by the adapter's request timeout; an expired timeout is
/// reported as [`RemoteError::Transport`](crate::RemoteError::Transport).
#[async_trait]
pub trait RemoteControl: Send + Sync {
    /// Retrieve every item the daemon currently tracks.
    async fn list(&self) -> RemoteResult<Vec<Item>>;

    /// Stop transferring an item.
    async fn pause(&self, id: &ItemId) -> RemoteResult<Ack>;

    /// Start transferring an item again.
    async fn resume(&self, id: &ItemId) -> RemoteResult<Ack>;

    /// Remove an item, optionally deleting its payload.
    async fn remove(&self, id: &ItemId, options: RemoveOptions) -> RemoteResult<Ack>;

    /// Resolve where the item's payload lives on the daemon's filesystem.
    async fn content_path(&self, id: &ItemId) -> RemoteResult<PathBuf>;

    /// List the files making up the item's payload.
    ///
    /// Adapters without a file listing refuse the call.
    async fn files(&self, id: &ItemId) -> RemoteResult<Vec<ItemFile>> {
        Err(RemoteError::rejected(
            "files",
            None,
            format!("file listing is not available for {id}"),
        ))
    }
}
