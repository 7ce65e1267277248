#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Daemon-agnostic torrent model, remote control contract, and error taxonomy.
//!
//! Layout: `model/` (items, statuses, identifiers), `service/` (`RemoteControl`
//! trait implemented by daemon adapters), `error.rs` (`RemoteError`).

pub mod error;
pub mod model;
pub mod service;

pub use error::{AuthFailureReason, RemoteError, RemoteResult};
pub use model::{
    Ack, Item, ItemFile, ItemId, ItemRates, ItemStatus, RemoveOptions, clamp_ratio,
};
pub use service::RemoteControl;
