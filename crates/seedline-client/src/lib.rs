#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! HTTP adapter for the qBittorrent WebUI control API.
//!
//! Layout:
//! - `session.rs`: connection target, credentials, and the session cookie
//! - `client.rs`: `QbitClient`, the `RemoteControl` implementation
//! - `wire.rs`: response DTOs and daemon state mapping

pub mod client;
pub mod session;
pub(crate) mod wire;

pub use client::QbitClient;
pub use session::{Credentials, SessionContext};
