// Keeps the pledge store in sync with the persistence adapter.
//
// Purpose
// - Own the only mutable copy of the store and publish a fresh view after every mutation.
//
// Responsibilities
// - Load the initial (capped) pledge list, failing soft into error state.
// - Subscribe to the adapter's change feed when it has one, load-only otherwise.
// - Accept confirmed writes from the submission controller without waiting for the echo.

use crate::modules::pledges::core::changes::{PLEDGES_TABLE, PledgeChange};
use crate::modules::pledges::core::errors::QueryError;
use crate::modules::pledges::core::pledge::Pledge;
use crate::modules::pledges::core::ports::{PledgeOrder, PledgeRepository};
use crate::modules::pledges::core::stats::Stats;
use crate::modules::pledges::use_cases::track_pledges::store::PledgeStore;
use crate::shared::infrastructure::change_feed::FeedWorker;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{RwLock, watch};

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PledgeView {
    pub pledges: Vec<Pledge>,
    pub stats: Stats,
    pub loading: bool,
    pub error: Option<QueryError>,
}

impl PledgeView {
    fn of(store: &PledgeStore) -> Self {
        Self {
            pledges: store.pledges().to_vec(),
            stats: store.stats(),
            loading: store.is_loading(),
            error: store.last_error().cloned(),
        }
    }
}

pub struct PledgeSync<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    repository: Arc<R>,
    store: RwLock<PledgeStore>,
    view: watch::Sender<PledgeView>,
    applied_changes: AtomicU64,
}

impl<R> PledgeSync<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    pub fn new(repository: Arc<R>, order: PledgeOrder, capacity: Option<usize>) -> Self {
        let store = PledgeStore::new(order, capacity);
        let (view, _) = watch::channel(PledgeView::of(&store));
        Self {
            repository,
            store: RwLock::new(store),
            view,
            applied_changes: AtomicU64::new(0),
        }
    }

    /// Also serves as refetch. The error is kept in the view as well as returned.
    /// Changes applied while the list is in flight are replayed over its result.
    pub async fn load(&self) -> Result<(), QueryError> {
        let (order, limit) = {
            let mut store = self.store.write().await;
            store.begin_load();
            self.publish(&store);
            (store.order(), store.capacity())
        };
        let result = self.repository.list_pledges(order, limit).await;
        let mut store = self.store.write().await;
        match result {
            Ok(pledges) => {
                store.replace_all(pledges);
                tracing::info!(count = store.len(), "pledges loaded");
                self.publish(&store);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load pledges");
                store.fail_load(e.clone());
                self.publish(&store);
                Err(e)
            }
        }
    }

    /// `Ok(None)` when the adapter has no change feed.
    pub async fn subscribe(self: &Arc<Self>) -> Result<Option<FeedWorker>, QueryError> {
        let Some(feed) = self.repository.change_feed() else {
            tracing::info!("no change feed, pledges refresh on load only");
            return Ok(None);
        };
        let subscription = match feed.subscribe_to_changes(PLEDGES_TABLE) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to subscribe to pledge changes");
                let mut store = self.store.write().await;
                store.record_failure(e.clone());
                self.publish(&store);
                return Err(e);
            }
        };
        tracing::info!(channel = %subscription.channel(), "subscribed to pledge changes");
        let sync = Arc::clone(self);
        Ok(Some(FeedWorker::spawn(subscription, move |change| {
            let sync = Arc::clone(&sync);
            async move {
                sync.apply(change).await;
            }
        })))
    }

    pub async fn apply(&self, change: PledgeChange) -> bool {
        let pledge_id = change.pledge_id().to_string();
        let mut store = self.store.write().await;
        let changed = store.apply(change);
        if changed {
            self.publish(&store);
        }
        self.applied_changes.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(pledge_id = %pledge_id, changed, "pledge change applied");
        changed
    }

    pub async fn insert_local(&self, pledge: Pledge) -> bool {
        let mut store = self.store.write().await;
        let changed = store.insert_local(pledge);
        if changed {
            self.publish(&store);
        }
        changed
    }

    /// Change-feed messages handled so far, including ones that were no-ops.
    pub fn applied_changes(&self) -> u64 {
        self.applied_changes.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<Pledge> {
        self.store.read().await.pledges().to_vec()
    }

    pub async fn stats(&self) -> Stats {
        self.store.read().await.stats()
    }

    pub async fn last_error(&self) -> Option<QueryError> {
        self.store.read().await.last_error().cloned()
    }

    pub fn watch(&self) -> watch::Receiver<PledgeView> {
        self.view.subscribe()
    }

    fn publish(&self, store: &PledgeStore) {
        self.view.send_replace(PledgeView::of(store));
    }

    /// Blocks every store write until the guard is dropped.
    #[cfg(test)]
    pub(crate) async fn hold_store(&self) -> tokio::sync::RwLockReadGuard<'_, PledgeStore> {
        self.store.read().await
    }
}
