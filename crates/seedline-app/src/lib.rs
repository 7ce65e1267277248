#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Seedline terminal client: command line, startup, and the terminal interface.
//!
//! Layout: `cli.rs` (flags and environment), `bootstrap.rs` (startup session,
//! wiring, shutdown), `error.rs` (`AppError` and exit codes), `ui/` (terminal
//! interface).

/// Startup, wiring, and shutdown.
pub mod bootstrap;
/// Command-line flags.
pub mod cli;
/// Application errors and exit codes.
pub mod error;
mod ui;

pub use bootstrap::{run, run_with};
pub use cli::Cli;
pub use error::{AppError, AppResult, EXIT_CONFIG, EXIT_FAILURE};
