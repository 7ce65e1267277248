//! Merge of a freshly fetched remote list into the committed items.
//!
//! Remote truth wins for every field. Pending actions only decide whether an
//! item that vanished remotely is kept for now, and whether their override is
//! resolved by what the daemon now reports.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use seedline_torrent_core::{Item, ItemId};
use tokio::time::Instant;
use tracing::warn;

use crate::pending::{ActionPhase, PendingAction};

/// Counters describing one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Items present remotely but not locally.
    pub added: usize,
    /// Items dropped because the daemon no longer reports them.
    pub removed: usize,
    /// Items whose fields changed.
    pub updated: usize,
    /// Items kept although absent remotely, pending an in-flight command.
    pub retained: usize,
    /// Remote entries ignored because their id was already seen.
    pub duplicates: usize,
}

/// Result of merging a remote list.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// New committed items, in remote order with retained items appended.
    pub items: Vec<Item>,
    /// Pending actions resolved by the remote state.
    pub settled: Vec<ItemId>,
    /// Confirmed overrides the daemon never converged on within the TTL.
    pub expired: Vec<ItemId>,
    /// Merge counters.
    pub stats: ReconcileStats,
}

/// Merge `remote` into `previous`, consulting the pending overrides.
#[must_use]
pub fn reconcile(
    previous: &[Item],
    remote: Vec<Item>,
    pending: &HashMap<ItemId, PendingAction>,
    now: Instant,
    pending_ttl: Duration,
) -> Reconciliation {
    let prior: HashMap<&ItemId, &Item> = previous.iter().map(|item| (&item.id, item)).collect();
    let mut stats = ReconcileStats::default();
    let mut seen = HashSet::with_capacity(remote.len());
    let mut items = Vec::with_capacity(remote.len());

    for item in remote {
        if seen.contains(&item.id) {
            warn!(item_id = %item.id, "daemon reported a duplicate item; keeping the first");
            stats.duplicates += 1;
            continue;
        }
        match prior.get(&item.id) {
            None => stats.added += 1,
            Some(old) if **old != item => stats.updated += 1,
            Some(_) => {}
        }
        seen.insert(item.id.clone());
        items.push(item);
    }

    for old in previous {
        if seen.contains(&old.id) {
            continue;
        }
        let retain = pending
            .get(&old.id)
            .is_some_and(|action| action.is_in_flight() && !action.kind.is_delete());
        if retain {
            stats.retained += 1;
            items.push(old.clone());
        } else {
            stats.removed += 1;
        }
    }

    let present: HashMap<&ItemId, &Item> = items.iter().map(|item| (&item.id, item)).collect();
    let mut settled = Vec::new();
    let mut expired = Vec::new();
    for (id, action) in pending {
        let remote_status = seen
            .contains(id)
            .then(|| present.get(id).map(|item| item.status))
            .flatten();
        if action.kind.is_settled_by(remote_status) {
            settled.push(id.clone());
            continue;
        }
        match action.phase {
            ActionPhase::Confirmed { .. } if !present.contains_key(id) => settled.push(id.clone()),
            ActionPhase::Confirmed { at } if now.saturating_duration_since(at) >= pending_ttl => {
                expired.push(id.clone());
            }
            _ => {}
        }
    }
    settled.sort();
    expired.sort();

    Reconciliation {
        items,
        settled,
        expired,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pending::{ActionKind, ActionToken};
    use seedline_torrent_core::ItemStatus;

    const TTL: Duration = Duration::from_secs(30);

    fn item(id: &str, status: ItemStatus, progress: f64) -> Item {
        Item::new(id, id.to_uppercase(), status).with_progress(progress)
    }

    fn pending_for(target: &Item, kind: ActionKind, phase: ActionPhase) -> HashMap<ItemId, PendingAction> {
        let mut action = PendingAction::issue(ActionToken(1), target, kind);
        action.phase = phase;
        HashMap::from([(target.id.clone(), action)])
    }

    #[test]
    fn same_list_twice_changes_nothing() {
        let remote = vec![
            item("a", ItemStatus::Downloading, 0.4),
            item("b", ItemStatus::Seeding, 1.0),
        ];
        let first = reconcile(&[], remote.clone(), &HashMap::new(), Instant::now(), TTL);
        assert_eq!(first.stats.added, 2);

        let second = reconcile(&first.items, remote, &HashMap::new(), Instant::now(), TTL);
        assert_eq!(second.items, first.items);
        assert_eq!(second.stats, ReconcileStats::default());
    }

    #[test]
    fn remote_order_wins_and_duplicates_are_dropped() {
        let previous = vec![item("a", ItemStatus::Queued, 0.0), item("gone", ItemStatus::Paused, 0.1)];
        let merged = reconcile(
            &previous,
            vec![
                item("c", ItemStatus::Downloading, 0.2),
                item("a", ItemStatus::Downloading, 0.5),
                item("c", ItemStatus::Error, 0.0),
            ],
            &HashMap::new(),
            Instant::now(),
            TTL,
        );
        let ids: Vec<&str> = merged.items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, ["c", "a"]);
        assert_eq!(merged.items[0].status, ItemStatus::Downloading);
        assert_eq!(merged.stats.added, 1);
        assert_eq!(merged.stats.updated, 1);
        assert_eq!(merged.stats.removed, 1);
        assert_eq!(merged.stats.duplicates, 1);
    }

    #[test]
    fn in_flight_target_is_retained_until_resolved() {
        let a = item("a", ItemStatus::Downloading, 0.4);
        let pending = pending_for(&a, ActionKind::Pause, ActionPhase::Issued);
        let merged = reconcile(&[a.clone()], Vec::new(), &pending, Instant::now(), TTL);
        assert_eq!(merged.items, vec![a]);
        assert_eq!(merged.stats.retained, 1);
        assert!(merged.settled.is_empty());
    }

    #[test]
    fn delete_settles_once_the_id_disappears() {
        let a = item("a", ItemStatus::Paused, 0.4);
        let pending = pending_for(
            &a,
            ActionKind::Delete { delete_files: false },
            ActionPhase::Issued,
        );
        let still_there = reconcile(&[a.clone()], vec![a.clone()], &pending, Instant::now(), TTL);
        assert!(still_there.settled.is_empty());

        let gone = reconcile(&[a.clone()], Vec::new(), &pending, Instant::now(), TTL);
        assert!(gone.items.is_empty());
        assert_eq!(gone.settled, vec![a.id]);
    }

    #[test]
    fn raced_completion_settles_a_pause() {
        let a = item("a", ItemStatus::Downloading, 0.99);
        let pending = pending_for(&a, ActionKind::Pause, ActionPhase::Issued);
        let merged = reconcile(
            &[a.clone()],
            vec![item("a", ItemStatus::Completed, 1.0)],
            &pending,
            Instant::now(),
            TTL,
        );
        assert_eq!(merged.settled, vec![a.id]);
        assert_eq!(merged.items[0].status, ItemStatus::Completed);
    }

    #[test]
    fn confirmed_override_expires_after_ttl() {
        let a = item("a", ItemStatus::Downloading, 0.4);
        let confirmed_at = Instant::now();
        let pending = pending_for(
            &a,
            ActionKind::Pause,
            ActionPhase::Confirmed { at: confirmed_at },
        );

        let early = reconcile(&[a.clone()], vec![a.clone()], &pending, confirmed_at, TTL);
        assert!(early.expired.is_empty());

        let late = reconcile(&[a.clone()], vec![a.clone()], &pending, confirmed_at + TTL, TTL);
        assert_eq!(late.expired, vec![a.id]);
    }
}
