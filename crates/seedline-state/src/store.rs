//! The single serialized mutation point for displayed item state.
//!
//! Committed items (remote truth) and optimistic overrides live behind one
//! mutex. Every mutation rebuilds the displayed [`Snapshot`] and swaps it into a
//! watch channel, so readers never block on writers and never see a partial
//! update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use seedline_torrent_core::{Item, ItemId};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::{DispatchError, DispatchResult};
use crate::pending::{ActionKind, ActionOutcome, ActionPhase, ActionToken, PendingAction};
use crate::reconcile::{ReconcileStats, reconcile};

/// Immutable view of every tracked item at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Number of reconciliations committed so far.
    pub generation: u64,
    /// Items in display order, with optimistic statuses applied.
    pub items: Vec<Item>,
}

impl Snapshot {
    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether no items are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What a commit changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Generation of the committed snapshot.
    pub generation: u64,
    /// Merge counters.
    pub stats: ReconcileStats,
    /// In-flight actions the remote state resolved before their call returned.
    pub superseded: Vec<ActionToken>,
    /// Confirmed actions the remote state has now converged on.
    pub settled: Vec<ActionToken>,
    /// Confirmed overrides dropped after the pending TTL.
    pub expired: Vec<ActionToken>,
}

#[derive(Debug, Default)]
struct StoreInner {
    base: Vec<Item>,
    generation: u64,
    pending: HashMap<ItemId, PendingAction>,
    next_token: u64,
}

impl StoreInner {
    fn displayed(&self) -> Snapshot {
        let items = self
            .base
            .iter()
            .map(|item| {
                let mut shown = item.clone();
                if let Some(action) = self.pending.get(&item.id) {
                    shown.status = action.optimistic;
                }
                shown
            })
            .collect();
        Snapshot {
            generation: self.generation,
            items,
        }
    }

    fn take_by_token(&mut self, token: ActionToken) -> Option<PendingAction> {
        let id = self
            .pending
            .values()
            .find(|action| action.token == token)
            .map(|action| action.item_id.clone())?;
        self.pending.remove(&id)
    }
}

/// Local authoritative-for-display store of tracked items.
#[derive(Debug)]
pub struct StateStore {
    inner: Mutex<StoreInner>,
    published: watch::Sender<Arc<Snapshot>>,
    pending_ttl: Duration,
}

impl StateStore {
    /// Create an empty store.
    ///
    /// `pending_ttl` bounds how long a confirmed override stays displayed while
    /// the daemon has not converged on it.
    #[must_use]
    pub fn new(pending_ttl: Duration) -> Self {
        let (published, _) = watch::channel(Arc::new(Snapshot::default()));
        Self {
            inner: Mutex::new(StoreInner::default()),
            published,
            pending_ttl,
        }
    }

    /// Latest published snapshot. Never blocks on writers.
    #[must_use]
    pub fn read(&self) -> Arc<Snapshot> {
        Arc::clone(&self.published.borrow())
    }

    /// Receive every published snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.published.subscribe()
    }

    /// Merge a fetched remote list and publish the result as the next generation.
    pub fn commit(&self, remote: Vec<Item>) -> CommitReport {
        let mut inner = self.lock();
        let merged = reconcile(
            &inner.base,
            remote,
            &inner.pending,
            Instant::now(),
            self.pending_ttl,
        );

        let mut report = CommitReport {
            stats: merged.stats,
            ..CommitReport::default()
        };
        for id in &merged.settled {
            let Some(action) = inner.pending.remove(id) else {
                continue;
            };
            if action.is_in_flight() {
                info!(
                    item_id = %id,
                    action = %action.kind,
                    token = %action.token,
                    "remote state superseded the pending action"
                );
                report.superseded.push(action.token);
            } else {
                report.settled.push(action.token);
            }
        }
        for id in &merged.expired {
            if let Some(action) = inner.pending.remove(id) {
                debug!(
                    item_id = %id,
                    action = %action.kind,
                    "daemon did not converge on the confirmed action; showing remote state"
                );
                report.expired.push(action.token);
            }
        }

        inner.base = merged.items;
        inner.generation += 1;
        report.generation = inner.generation;
        self.publish(&inner);
        debug!(
            generation = report.generation,
            added = report.stats.added,
            removed = report.stats.removed,
            updated = report.stats.updated,
            retained = report.stats.retained,
            "snapshot committed"
        );
        report
    }

    /// Display `kind`'s predicted status for `id` until the action resolves.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownItem`] when `id` is not displayed and
    /// [`DispatchError::ActionInProgress`] when another action for `id` is in flight.
    pub fn apply_optimistic(&self, id: &ItemId, kind: ActionKind) -> DispatchResult<ActionToken> {
        let mut inner = self.lock();
        let Some(target) = inner.base.iter().find(|item| &item.id == id).cloned() else {
            return Err(DispatchError::UnknownItem { id: id.clone() });
        };
        if inner
            .pending
            .get(id)
            .is_some_and(PendingAction::blocks_new_commands)
        {
            return Err(DispatchError::ActionInProgress { id: id.clone() });
        }

        inner.next_token += 1;
        let token = ActionToken(inner.next_token);
        let action = PendingAction::issue(token, &target, kind);
        debug!(
            item_id = %id,
            action = %kind,
            token = %token,
            optimistic = %action.optimistic,
            "optimistic update applied"
        );
        inner.pending.insert(id.clone(), action);
        self.publish(&inner);
        Ok(token)
    }

    /// Mark the action as accepted by the daemon; the override stays displayed.
    ///
    /// Returns [`ActionOutcome::Superseded`] when reconciliation already resolved it.
    pub fn confirm(&self, token: ActionToken) -> ActionOutcome {
        let mut inner = self.lock();
        match inner
            .pending
            .values_mut()
            .find(|action| action.token == token && action.is_in_flight())
        {
            Some(action) => {
                action.phase = ActionPhase::Confirmed { at: Instant::now() };
                ActionOutcome::Confirmed
            }
            None => ActionOutcome::Superseded,
        }
    }

    /// Revert exactly the override identified by `token`, if it is still present.
    pub fn rollback(&self, token: ActionToken) -> ActionOutcome {
        let mut inner = self.lock();
        match inner.take_by_token(token) {
            Some(action) => {
                debug!(item_id = %action.item_id, action = %action.kind, token = %token, "override rolled back");
                self.publish(&inner);
                ActionOutcome::RolledBack
            }
            None => ActionOutcome::Superseded,
        }
    }

    /// Pending action for an item, if any.
    #[must_use]
    pub fn pending(&self, id: &ItemId) -> Option<PendingAction> {
        self.lock().pending.get(id).cloned()
    }

    /// Every pending action, ordered by token.
    #[must_use]
    pub fn pending_actions(&self) -> Vec<PendingAction> {
        let mut actions: Vec<_> = self.lock().pending.values().cloned().collect();
        actions.sort_by_key(|action| action.token);
        actions
    }

    fn publish(&self, inner: &StoreInner) {
        self.published.send_replace(Arc::new(inner.displayed()));
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedline_torrent_core::ItemStatus;

    fn store_with(items: Vec<Item>) -> StateStore {
        let store = StateStore::new(Duration::from_secs(30));
        store.commit(items);
        store
    }

    fn downloading(id: &str) -> Item {
        Item::new(id, id, ItemStatus::Downloading).with_progress(0.4)
    }

    fn status_of(store: &StateStore, id: &str) -> Option<ItemStatus> {
        store.read().get(&ItemId::new(id)).map(|item| item.status)
    }

    #[test]
    fn commit_increments_generation_and_publishes() {
        let store = StateStore::new(Duration::from_secs(30));
        let mut watcher = store.subscribe();
        assert_eq!(store.read().generation, 0);

        let report = store.commit(vec![downloading("a")]);
        assert_eq!(report.generation, 1);
        assert!(watcher.has_changed().unwrap_or(false));
        assert_eq!(watcher.borrow_and_update().len(), 1);
    }

    #[test]
    fn optimistic_override_does_not_bump_generation() {
        let store = store_with(vec![downloading("a")]);
        let before = store.read();
        store
            .apply_optimistic(&ItemId::new("a"), ActionKind::Pause)
            .expect("apply");
        let after = store.read();

        assert_eq!(before.generation, after.generation);
        assert_eq!(before.items[0].status, ItemStatus::Downloading);
        assert_eq!(after.items[0].status, ItemStatus::Paused);
    }

    #[test]
    fn unknown_and_busy_items_are_refused() {
        let store = store_with(vec![downloading("a")]);
        assert!(matches!(
            store.apply_optimistic(&ItemId::new("zz"), ActionKind::Pause),
            Err(DispatchError::UnknownItem { .. })
        ));

        let delete = ActionKind::Delete {
            delete_files: false,
        };
        store
            .apply_optimistic(&ItemId::new("a"), delete)
            .expect("first delete");
        assert!(matches!(
            store.apply_optimistic(&ItemId::new("a"), delete),
            Err(DispatchError::ActionInProgress { .. })
        ));
    }

    #[test]
    fn confirmed_override_can_be_replaced() {
        let store = store_with(vec![downloading("a")]);
        let id = ItemId::new("a");
        let pause = store.apply_optimistic(&id, ActionKind::Pause).expect("pause");
        assert_eq!(store.confirm(pause), ActionOutcome::Confirmed);

        let resume = store
            .apply_optimistic(&id, ActionKind::Resume)
            .expect("resume replaces confirmed pause");
        assert_eq!(status_of(&store, "a"), Some(ItemStatus::Downloading));
        assert_eq!(store.rollback(pause), ActionOutcome::Superseded);
        assert_eq!(store.rollback(resume), ActionOutcome::RolledBack);
    }

    #[test]
    fn rollback_restores_committed_status() {
        let store = store_with(vec![downloading("a")]);
        let token = store
            .apply_optimistic(&ItemId::new("a"), ActionKind::Pause)
            .expect("apply");
        assert_eq!(status_of(&store, "a"), Some(ItemStatus::Paused));

        assert_eq!(store.rollback(token), ActionOutcome::RolledBack);
        assert_eq!(status_of(&store, "a"), Some(ItemStatus::Downloading));
        assert_eq!(store.rollback(token), ActionOutcome::Superseded);
    }

    #[test]
    fn reconciliation_supersedes_in_flight_action() {
        let store = store_with(vec![downloading("a")]);
        let token = store
            .apply_optimistic(&ItemId::new("a"), ActionKind::Pause)
            .expect("apply");

        let report = store.commit(vec![
            Item::new("a", "a", ItemStatus::Completed).with_progress(1.0),
        ]);
        assert_eq!(report.superseded, vec![token]);
        assert_eq!(status_of(&store, "a"), Some(ItemStatus::Completed));
        assert_eq!(store.confirm(token), ActionOutcome::Superseded);
        assert_eq!(store.rollback(token), ActionOutcome::Superseded);
        assert!(store.pending_actions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unconverged_confirmation_expires() {
        let store = store_with(vec![downloading("a")]);
        let token = store
            .apply_optimistic(&ItemId::new("a"), ActionKind::Pause)
            .expect("apply");
        store.confirm(token);

        store.commit(vec![downloading("a")]);
        assert_eq!(status_of(&store, "a"), Some(ItemStatus::Paused));

        tokio::time::advance(Duration::from_secs(31)).await;
        let report = store.commit(vec![downloading("a")]);
        assert_eq!(report.expired, vec![token]);
        assert_eq!(status_of(&store, "a"), Some(ItemStatus::Downloading));
    }
}
