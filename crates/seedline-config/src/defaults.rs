//! Built-in configuration values.
//!
//! # Design
//! - Poll cadence and the degraded threshold are operator-tunable; these are
//!   only the starting point.

use std::path::PathBuf;
use std::time::Duration;

/// Bounded timeout applied to every daemon call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between two reconciliations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Consecutive failed polls before the view is flagged stale.
pub const DEFAULT_DEGRADED_THRESHOLD: u32 = 3;
/// How long a confirmed optimistic status may outlive a non-converging daemon.
pub const DEFAULT_PENDING_TTL: Duration = Duration::from_secs(30);

pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";
pub(crate) const APP_DIR: &str = "seedline";
pub(crate) const CONFIG_FILE: &str = "config.yaml";

pub(crate) fn default_log_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(APP_DIR))
}
