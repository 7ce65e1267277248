//! Process-level span carrying run and build identifiers.

use once_cell::sync::Lazy;
use tracing::{Span, span::Entered};
use uuid::Uuid;

use crate::init::build_sha;

static RUN_ID: Lazy<Uuid> = Lazy::new(Uuid::new_v4);

/// Identifier of this process run, shared by every log line it emits.
#[must_use]
pub fn run_id() -> Uuid {
    *RUN_ID
}

/// Guard that keeps the process span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the process span, tagging it with the daemon URL.
    #[must_use]
    pub fn new(daemon: impl Into<String>) -> Self {
        let daemon = daemon.into();
        let span: &'static Span = Box::leak(Box::new(tracing::info_span!(
            "seedline",
            run_id = %run_id(),
            build_sha = %build_sha(),
            daemon = %daemon
        )));
        let guard = span.enter();
        Self { _guard: guard }
    }
}
