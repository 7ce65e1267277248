//! Periodic reconciliation of the store with the daemon.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use seedline_torrent_core::RemoteControl;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::store::{CommitReport, StateStore};

/// Operator-tunable polling parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Delay between two reconciliations.
    pub poll_interval: Duration,
    /// Consecutive failed polls before the view is flagged as degraded.
    pub degraded_threshold: u32,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            degraded_threshold: 3,
        }
    }
}

/// Freshness of the displayed snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncHealth {
    /// Failed polls since the last success.
    pub consecutive_failures: u32,
    /// Whether the failure threshold has been reached.
    pub degraded: bool,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// When the last poll succeeded.
    pub last_success_at: Option<DateTime<Utc>>,
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The fetched list was committed.
    Committed(CommitReport),
    /// The poll failed; the store was left untouched.
    Failed {
        /// Failed polls in a row, including this one.
        consecutive_failures: u32,
    },
}

/// Fetches the daemon's list and commits it into the store.
pub struct Synchronizer {
    remote: Arc<dyn RemoteControl>,
    store: Arc<StateStore>,
    policy: SyncPolicy,
    health: watch::Sender<SyncHealth>,
    wake: Arc<Notify>,
}

impl Synchronizer {
    /// Build a synchronizer; nothing runs until [`Synchronizer::spawn`] or
    /// [`Synchronizer::tick`] is called.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteControl>, store: Arc<StateStore>, policy: SyncPolicy) -> Self {
        let (health, _) = watch::channel(SyncHealth::default());
        Self {
            remote,
            store,
            policy,
            health,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Receive health updates.
    #[must_use]
    pub fn health(&self) -> watch::Receiver<SyncHealth> {
        self.health.subscribe()
    }

    /// Run one reconciliation pass. Failures are absorbed into [`SyncHealth`].
    pub async fn tick(&self) -> TickOutcome {
        match self.remote.list().await {
            Ok(items) => {
                let report = self.store.commit(items);
                self.health.send_modify(|health| {
                    if health.degraded {
                        info!(
                            failures = health.consecutive_failures,
                            "daemon reachable again"
                        );
                    }
                    *health = SyncHealth {
                        last_success_at: Some(Utc::now()),
                        ..SyncHealth::default()
                    };
                });
                TickOutcome::Committed(report)
            }
            Err(err) => {
                let threshold = self.policy.degraded_threshold.max(1);
                let mut failures = 0;
                self.health.send_modify(|health| {
                    health.consecutive_failures = health.consecutive_failures.saturating_add(1);
                    health.last_error = Some(err.to_string());
                    if !health.degraded && health.consecutive_failures >= threshold {
                        warn!(
                            failures = health.consecutive_failures,
                            "view marked stale after repeated poll failures"
                        );
                        health.degraded = true;
                    }
                    failures = health.consecutive_failures;
                });
                warn!(error = %err, failures, transient = err.is_transient(), "poll failed");
                TickOutcome::Failed {
                    consecutive_failures: failures,
                }
            }
        }
    }

    /// Run on the configured interval until the handle is shut down.
    #[must_use]
    pub fn spawn(self) -> SyncHandle {
        let wake = Arc::clone(&self.wake);
        let health = self.health();
        let task = tokio::spawn(async move {
            let mut ticker = interval(self.policy.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    () = self.wake.notified() => {
                        debug!("manual refresh requested");
                        ticker.reset();
                    }
                }
                self.tick().await;
            }
        });
        SyncHandle { task, wake, health }
    }
}

/// Control handle of a running synchronizer.
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<()>,
    wake: Arc<Notify>,
    health: watch::Receiver<SyncHealth>,
}

impl SyncHandle {
    /// Poll immediately instead of waiting for the next interval.
    pub fn refresh_now(&self) {
        self.wake.notify_one();
    }

    /// Receive health updates.
    #[must_use]
    pub fn health(&self) -> watch::Receiver<SyncHealth> {
        self.health.clone()
    }

    /// Stop polling. An in-flight poll is dropped, not awaited.
    pub fn shutdown(self) {
        self.task.abort();
    }
}
