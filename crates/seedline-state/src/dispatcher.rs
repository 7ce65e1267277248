//! Translation of operator intents into optimistic updates and remote calls.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use seedline_torrent_core::{ItemFile, ItemId, RemoteControl, RemoteResult, RemoveOptions};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{DispatchError, DispatchResult};
use crate::opener::FileOpener;
use crate::pending::{ActionKind, ActionOutcome, ActionToken};
use crate::store::StateStore;

/// Discrete command produced by the input surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Pause an item.
    Pause(ItemId),
    /// Resume an item.
    Resume(ItemId),
    /// Pause a running item or resume a stopped one, based on what is displayed.
    Toggle(ItemId),
    /// Remove an item from the daemon.
    Delete {
        /// Target item.
        id: ItemId,
        /// Whether the payload is deleted from disk as well.
        delete_files: bool,
    },
    /// Open the item's payload locally.
    Open(ItemId),
    /// Open the directory holding the item's payload.
    OpenFolder(ItemId),
    /// List the files making up the item's payload.
    Files(ItemId),
    /// Open one file of the payload, named relative to the save directory.
    OpenFile {
        /// Target item.
        id: ItemId,
        /// File name as listed by the daemon.
        name: String,
    },
}

impl Intent {
    /// Item the intent targets.
    #[must_use]
    pub const fn item_id(&self) -> &ItemId {
        match self {
            Self::Pause(id)
            | Self::Resume(id)
            | Self::Toggle(id)
            | Self::Delete { id, .. }
            | Self::Open(id)
            | Self::OpenFolder(id)
            | Self::Files(id)
            | Self::OpenFile { id, .. } => id,
        }
    }
}

/// How content paths reported by the daemon map onto this machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenPolicy {
    /// The daemon runs elsewhere; opening files is disabled.
    pub remote_mode: bool,
    /// Daemon-side prefix to local prefix pairs.
    pub rewrites: Vec<(PathBuf, PathBuf)>,
}

impl OpenPolicy {
    /// Apply the rewrite with the longest matching prefix, if any.
    #[must_use]
    pub fn rewrite(&self, path: &Path) -> PathBuf {
        self.rewrites
            .iter()
            .filter_map(|(from, to)| {
                let rest = path.strip_prefix(from).ok()?;
                let local = if rest.as_os_str().is_empty() {
                    to.clone()
                } else {
                    to.join(rest)
                };
                Some((from.components().count(), local))
            })
            .max_by_key(|(depth, _)| *depth)
            .map_or_else(|| path.to_path_buf(), |(_, local)| local)
    }
}

/// Short operator-facing message about a finished command.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    /// Item the command targeted.
    pub item_id: ItemId,
    /// Rendered message.
    pub message: String,
    /// Whether the command failed.
    pub is_error: bool,
    /// File listing produced by a [`Intent::Files`] command.
    pub files: Option<Vec<ItemFile>>,
}

impl Display for Notice {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

/// Terminal result of a dispatched command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The daemon accepted the command; the override stays until it converges.
    Confirmed,
    /// The command failed and its override was reverted.
    RolledBack(DispatchError),
    /// Reconciliation resolved the override first. A failure is still reported.
    Superseded(Option<DispatchError>),
    /// The payload was handed to the platform opener.
    Opened(PathBuf),
    /// The payload could not be opened; the store was not touched.
    OpenFailed(DispatchError),
    /// The daemon listed the item's files.
    Listed(Vec<ItemFile>),
    /// The file listing failed; the store was not touched.
    ListFailed(DispatchError),
}

/// What an open command hands to the platform opener.
#[derive(Debug, Clone)]
enum OpenTarget {
    /// The payload itself; only a finished download can be opened.
    Payload { complete: bool },
    /// The directory holding the payload, whatever the progress.
    Folder,
    /// One file below the save directory.
    File { save_path: Option<PathBuf>, name: String },
}

/// Handle to a command whose remote part runs in the background.
#[derive(Debug)]
pub struct Dispatched {
    /// Override token for status-changing commands.
    pub token: Option<ActionToken>,
    /// Background task resolving the command.
    pub task: JoinHandle<CommandOutcome>,
}

/// Issues commands against the daemon while keeping the store consistent.
#[derive(Clone)]
pub struct Dispatcher {
    remote: Arc<dyn RemoteControl>,
    store: Arc<StateStore>,
    opener: Arc<dyn FileOpener>,
    policy: Arc<OpenPolicy>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl Dispatcher {
    /// Wire a dispatcher to its collaborators; outcomes are reported on `notices`.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteControl>,
        store: Arc<StateStore>,
        opener: Arc<dyn FileOpener>,
        policy: OpenPolicy,
        notices: mpsc::UnboundedSender<Notice>,
    ) -> Self {
        Self {
            remote,
            store,
            opener,
            policy: Arc::new(policy),
            notices,
        }
    }

    /// Validate `intent`, apply its optimistic update, and start the remote call.
    ///
    /// Returns as soon as the update is visible; the remote part resolves on the
    /// returned task. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails fast without contacting the daemon with
    /// [`DispatchError::UnknownItem`], [`DispatchError::ActionInProgress`], or
    /// [`DispatchError::OpenDisabled`]. Open commands are refused like any other
    /// while a command for the same item is unresolved.
    pub fn dispatch(&self, intent: Intent) -> DispatchResult<Dispatched> {
        let snapshot = self.store.read();
        let id = intent.item_id().clone();
        let Some(item) = snapshot.get(&id) else {
            return Err(DispatchError::UnknownItem { id });
        };
        let name = item.name.clone();
        let complete = item.is_complete();
        let save_path = item.save_path.as_ref().map(PathBuf::from);

        let kind = match intent {
            Intent::Pause(_) => ActionKind::Pause,
            Intent::Resume(_) => ActionKind::Resume,
            Intent::Toggle(_) if item.status.is_running() => ActionKind::Pause,
            Intent::Toggle(_) => ActionKind::Resume,
            Intent::Delete { delete_files, .. } => ActionKind::Delete { delete_files },
            Intent::Open(_) => return self.start_open(id, name, OpenTarget::Payload { complete }),
            Intent::OpenFolder(_) => return self.start_open(id, name, OpenTarget::Folder),
            Intent::OpenFile { name: file, .. } => {
                return self.start_open(id, name, OpenTarget::File { save_path, name: file });
            }
            Intent::Files(_) => return self.start_files(id, name),
        };

        let token = self.store.apply_optimistic(&id, kind)?;
        debug!(item_id = %id, action = %kind, token = %token, "dispatching command");
        let this = self.clone();
        let task = tokio::spawn(async move { this.run_action(id, name, kind, token).await });
        Ok(Dispatched {
            token: Some(token),
            task,
        })
    }

    fn start_open(&self, id: ItemId, name: String, target: OpenTarget) -> DispatchResult<Dispatched> {
        if self.policy.remote_mode {
            return Err(DispatchError::OpenDisabled);
        }
        self.ensure_idle(&id)?;
        let this = self.clone();
        let task = tokio::spawn(async move { this.run_open(id, name, target).await });
        Ok(Dispatched { token: None, task })
    }

    fn start_files(&self, id: ItemId, name: String) -> DispatchResult<Dispatched> {
        self.ensure_idle(&id)?;
        let this = self.clone();
        let task = tokio::spawn(async move { this.run_files(id, name).await });
        Ok(Dispatched { token: None, task })
    }

    /// Refuse a command while the item has an unresolved action.
    fn ensure_idle(&self, id: &ItemId) -> DispatchResult<()> {
        if self
            .store
            .pending(id)
            .is_some_and(|action| action.blocks_new_commands())
        {
            return Err(DispatchError::ActionInProgress { id: id.clone() });
        }
        Ok(())
    }

    async fn run_action(
        &self,
        id: ItemId,
        name: String,
        kind: ActionKind,
        token: ActionToken,
    ) -> CommandOutcome {
        match self.call_remote(&id, kind).await {
            Ok(()) => {
                let outcome = self.store.confirm(token);
                info!(item_id = %id, action = %kind, ?outcome, "command accepted by daemon");
                self.notify(&id, format!("{kind} requested for {name}"), false);
                match outcome {
                    ActionOutcome::Confirmed => CommandOutcome::Confirmed,
                    ActionOutcome::RolledBack | ActionOutcome::Superseded => {
                        CommandOutcome::Superseded(None)
                    }
                }
            }
            Err(source) => {
                let err = DispatchError::Remote {
                    operation: kind.operation(),
                    id: id.clone(),
                    source,
                };
                let outcome = self.store.rollback(token);
                warn!(item_id = %id, action = %kind, ?outcome, error = %err, "command failed");
                self.notify(&id, format!("{kind} failed for {name}: {err}"), true);
                match outcome {
                    ActionOutcome::RolledBack => CommandOutcome::RolledBack(err),
                    ActionOutcome::Confirmed | ActionOutcome::Superseded => {
                        CommandOutcome::Superseded(Some(err))
                    }
                }
            }
        }
    }

    async fn call_remote(&self, id: &ItemId, kind: ActionKind) -> RemoteResult<()> {
        match kind {
            ActionKind::Pause => self.remote.pause(id).await?,
            ActionKind::Resume => self.remote.resume(id).await?,
            ActionKind::Delete { delete_files } => {
                self.remote
                    .remove(id, RemoveOptions { delete_files })
                    .await?
            }
        };
        Ok(())
    }

    async fn run_open(&self, id: ItemId, name: String, target: OpenTarget) -> CommandOutcome {
        match self.open_content(&id, target).await {
            Ok(path) => {
                info!(item_id = %id, path = %path.display(), "handed content to the opener");
                self.notify(&id, format!("opened {}", path.display()), false);
                CommandOutcome::Opened(path)
            }
            Err(err) => {
                warn!(item_id = %id, error = %err, "cannot open content");
                self.notify(&id, format!("cannot open {name}: {err}"), true);
                CommandOutcome::OpenFailed(err)
            }
        }
    }

    async fn run_files(&self, id: ItemId, name: String) -> CommandOutcome {
        match self.remote.files(&id).await {
            Ok(files) => {
                debug!(item_id = %id, count = files.len(), "listed files");
                let notice = Notice {
                    item_id: id,
                    message: format!("{} files in {name}", files.len()),
                    is_error: false,
                    files: Some(files.clone()),
                };
                if self.notices.send(notice).is_err() {
                    debug!("notice receiver dropped");
                }
                CommandOutcome::Listed(files)
            }
            Err(source) => {
                let err = DispatchError::Remote {
                    operation: "files",
                    id: id.clone(),
                    source,
                };
                warn!(item_id = %id, error = %err, "cannot list files");
                self.notify(&id, format!("cannot list files of {name}: {err}"), true);
                CommandOutcome::ListFailed(err)
            }
        }
    }

    async fn open_content(&self, id: &ItemId, target: OpenTarget) -> DispatchResult<PathBuf> {
        let target = match target {
            OpenTarget::Payload { complete: false } => {
                return Err(DispatchError::content_unavailable(
                    id,
                    "download is not complete yet",
                ));
            }
            OpenTarget::Payload { complete: true } => self.local_content_path(id).await?,
            OpenTarget::Folder => {
                let local = self.local_content_path(id).await?;
                if is_dir(&local).await {
                    local
                } else {
                    local.parent().map_or_else(|| local.clone(), Path::to_path_buf)
                }
            }
            OpenTarget::File { save_path, name } => {
                let Some(save_path) = save_path else {
                    return Err(DispatchError::content_unavailable(
                        id,
                        "daemon has not reported a save path",
                    ));
                };
                self.policy.rewrite(&save_path.join(name))
            }
        };
        if !tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(DispatchError::content_unavailable(
                id,
                format!("{} does not exist locally", target.display()),
            ));
        }

        self.opener
            .open(&target)
            .map_err(|err| DispatchError::content_unavailable(id, format!("opener failed: {err}")))?;
        Ok(target)
    }

    async fn local_content_path(&self, id: &ItemId) -> DispatchResult<PathBuf> {
        let reported = self
            .remote
            .content_path(id)
            .await
            .map_err(|err| DispatchError::content_unavailable(id, err.to_string()))?;
        Ok(self.policy.rewrite(&reported))
    }

    fn notify(&self, id: &ItemId, message: String, is_error: bool) {
        let notice = Notice {
            item_id: id.clone(),
            message,
            is_error,
            files: None,
        };
        if self.notices.send(notice).is_err() {
            debug!(item_id = %id, "notice receiver dropped");
        }
    }
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_dir())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_rewrite_prefix_wins() {
        let policy = OpenPolicy {
            remote_mode: false,
            rewrites: vec![
                (PathBuf::from("/downloads"), PathBuf::from("/mnt/nas")),
                (
                    PathBuf::from("/downloads/movies"),
                    PathBuf::from("/media/movies"),
                ),
            ],
        };
        assert_eq!(
            policy.rewrite(Path::new("/downloads/movies/film.mkv")),
            PathBuf::from("/media/movies/film.mkv")
        );
        assert_eq!(
            policy.rewrite(Path::new("/downloads/iso/disk.iso")),
            PathBuf::from("/mnt/nas/iso/disk.iso")
        );
        assert_eq!(
            policy.rewrite(Path::new("/downloads")),
            PathBuf::from("/mnt/nas")
        );
        assert_eq!(
            policy.rewrite(Path::new("/srv/other")),
            PathBuf::from("/srv/other")
        );
    }

    #[test]
    fn rewrite_matches_whole_components_only() {
        let policy = OpenPolicy {
            remote_mode: false,
            rewrites: vec![(PathBuf::from("/data"), PathBuf::from("/local"))],
        };
        assert_eq!(
            policy.rewrite(Path::new("/database/file")),
            PathBuf::from("/database/file")
        );
    }

    #[test]
    fn intents_expose_their_target() {
        let id = ItemId::new("a");
        let intent = Intent::Delete {
            id: id.clone(),
            delete_files: true,
        };
        assert_eq!(intent.item_id(), &id);
        assert_eq!(Intent::OpenFolder(id.clone()).item_id(), &id);
        let open_file = Intent::OpenFile {
            id: id.clone(),
            name: "disc/01.flac".into(),
        };
        assert_eq!(open_file.item_id(), &id);
    }
}
