#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Local view of the daemon's items and the loops that keep it honest.
//!
//! Layout:
//! - `store.rs`: `StateStore`, the single serialized mutation point and the
//!   published `Snapshot`
//! - `reconcile.rs`: pure merge of a fetched list into the committed items
//! - `pending.rs`: per-item optimistic action records
//! - `synchronizer.rs`: periodic reconciliation task and its health signal
//! - `dispatcher.rs`: user intents to optimistic updates and remote calls
//! - `opener.rs`: platform file-opener seam

pub mod dispatcher;
pub mod error;
pub mod opener;
pub mod pending;
pub mod reconcile;
pub mod store;
pub mod synchronizer;

pub use dispatcher::{CommandOutcome, Dispatched, Dispatcher, Intent, Notice, OpenPolicy};
pub use error::{DispatchError, DispatchResult};
pub use opener::{FileOpener, SystemOpener};
pub use pending::{ActionKind, ActionOutcome, ActionPhase, ActionToken, PendingAction};
pub use reconcile::{ReconcileStats, Reconciliation, reconcile};
pub use store::{CommitReport, Snapshot, StateStore};
pub use synchronizer::{SyncHandle, SyncHealth, SyncPolicy, Synchronizer, TickOutcome};
