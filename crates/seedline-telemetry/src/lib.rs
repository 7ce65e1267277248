#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Logging setup shared by the seedline binaries.
//!
//! The terminal UI owns stdout, so logs are written to a daily-rolling file
//! when a log directory is available and to stderr otherwise.

pub mod context;
pub mod error;
pub mod init;

pub use context::{GlobalContextGuard, run_id};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, LoggingGuard, build_sha, init_logging};
