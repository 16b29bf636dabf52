// Exact headline stats over the whole pledges table.
//
// The pledge store may be capped; these numbers never are. They are computed
// from a full scan, which is the only authoritative way to get them.

use crate::modules::pledges::core::changes::{PLEDGES_TABLE, PledgeChange};
use crate::modules::pledges::core::errors::QueryError;
use crate::modules::pledges::core::ports::{PledgeOrder, PledgeRepository};
use crate::modules::pledges::core::stats::{Stats, summarize};
use crate::shared::infrastructure::change_feed::FeedWorker;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

pub struct StatsQuery<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    repository: Arc<R>,
}

impl<R> StatsQuery<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    pub async fn run(&self) -> Result<Stats, QueryError> {
        let pledges = self
            .repository
            .list_pledges(PledgeOrder::InsertionOrder, None)
            .await?;
        Ok(summarize(&pledges))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsView {
    pub stats: Stats,
    pub loading: bool,
    pub error: Option<QueryError>,
    /// Which refresh produced this view. A refresh never replaces a later one.
    pub revision: u64,
}

impl Default for StatsView {
    fn default() -> Self {
        Self {
            stats: Stats::default(),
            loading: true,
            error: None,
            revision: 0,
        }
    }
}

/// Recomputes the stats on start and after every change the backend pushes.
pub struct RealtimeStats<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    repository: Arc<R>,
    query: StatsQuery<R>,
    view: watch::Sender<StatsView>,
    issued: AtomicU64,
}

impl<R> RealtimeStats<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        let (view, _) = watch::channel(StatsView::default());
        Self {
            query: StatsQuery::new(Arc::clone(&repository)),
            repository,
            view,
            issued: AtomicU64::new(0),
        }
    }

    /// On failure the view falls back to zeroed stats plus the error.
    /// Overlapping refreshes publish in the order they started.
    pub async fn refresh(&self) -> Result<Stats, QueryError> {
        let revision = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let result = self.query.run().await;
        let next = match &result {
            Ok(stats) => {
                tracing::debug!(count = stats.count, total = stats.total_monthly, "stats refreshed");
                StatsView {
                    stats: *stats,
                    loading: false,
                    error: None,
                    revision,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load statistics");
                StatsView {
                    stats: Stats::default(),
                    loading: false,
                    error: Some(e.clone()),
                    revision,
                }
            }
        };
        self.view.send_if_modified(|view| {
            if view.revision > revision {
                tracing::debug!(revision, latest = view.revision, "stale stats dropped");
                return false;
            }
            *view = next;
            true
        });
        result
    }

    /// `Ok(None)` when the adapter has no change feed.
    pub fn subscribe(self: &Arc<Self>) -> Result<Option<FeedWorker>, QueryError> {
        let Some(feed) = self.repository.change_feed() else {
            return Ok(None);
        };
        let subscription = feed.subscribe_to_changes(PLEDGES_TABLE)?;
        let stats = Arc::clone(self);
        Ok(Some(FeedWorker::spawn(
            subscription,
            move |change: PledgeChange| {
                let stats = Arc::clone(&stats);
                async move {
                    tracing::debug!(pledge_id = %change.pledge_id(), "reloading stats after change");
                    let _ = stats.refresh().await;
                }
            },
        )))
    }

    pub fn current(&self) -> StatsView {
        self.view.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<StatsView> {
        self.view.subscribe()
    }
}
