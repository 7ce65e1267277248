#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Typed configuration for the seedline client.
//!
//! Layout: `model.rs` (validated `ClientConfig` and the raw `ConfigOverlay`),
//! `defaults.rs` (built-in values), `loader.rs` (YAML file and layering),
//! `validate.rs` (overlay to config conversion).

mod defaults;
pub mod error;
pub mod loader;
pub mod model;
mod validate;

pub use defaults::{
    DEFAULT_DEGRADED_THRESHOLD, DEFAULT_PENDING_TTL, DEFAULT_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{default_config_path, load, load_file};
pub use model::{ClientConfig, ConfigOverlay, PathRewrite};
