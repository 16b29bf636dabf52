// Composition root for the pledges context.
//
// Responsibilities
// - Pick the persistence adapter from config.
// - Wire it into the store sync, the stats query and the submission controller.
// - Start the change-feed workers and tear everything down on shutdown.

use crate::modules::pledges::adapters::outbound::in_memory::InMemoryPledgeRepository;
use crate::modules::pledges::adapters::outbound::local_file::LocalFilePledgeRepository;
use crate::modules::pledges::core::errors::QueryError;
use crate::modules::pledges::core::ports::PledgeRepository;
use crate::modules::pledges::use_cases::submit_pledge::celebration::Celebration;
use crate::modules::pledges::use_cases::submit_pledge::controller::SubmissionController;
use crate::modules::pledges::use_cases::summarize_pledges::handler::RealtimeStats;
use crate::modules::pledges::use_cases::track_pledges::handler::PledgeSync;
use crate::shared::infrastructure::change_feed::FeedWorker;
use crate::shell::config::{AppConfig, Backend};
use std::sync::Arc;

pub struct AppState {
    pub repository: Arc<dyn PledgeRepository>,
    pub pledges: Arc<PledgeSync<dyn PledgeRepository>>,
    pub stats: Arc<RealtimeStats<dyn PledgeRepository>>,
    pub submissions: Arc<SubmissionController<dyn PledgeRepository>>,
    pub celebration: Arc<Celebration>,
    workers: Vec<FeedWorker>,
}

impl AppState {
    pub async fn build(config: &AppConfig) -> Result<Self, QueryError> {
        let repository: Arc<dyn PledgeRepository> = match config.backend {
            Backend::InMemory => Arc::new(InMemoryPledgeRepository::new()),
            Backend::LocalFile => Arc::new(LocalFilePledgeRepository::open(&config.file).await?),
        };
        tracing::info!(backend = ?config.backend, order = ?config.order, capacity = ?config.capacity, "pledge backend selected");
        Ok(Self::with_repository(repository, config))
    }

    pub fn with_repository(repository: Arc<dyn PledgeRepository>, config: &AppConfig) -> Self {
        let pledges = Arc::new(PledgeSync::new(
            Arc::clone(&repository),
            config.order,
            config.capacity,
        ));
        let stats = Arc::new(RealtimeStats::new(Arc::clone(&repository)));
        let celebration = Arc::new(Celebration::default());
        let submissions = Arc::new(SubmissionController::new(
            Arc::clone(&repository),
            Arc::clone(&pledges),
            Arc::clone(&celebration),
            config.submission,
        ));
        Self {
            repository,
            pledges,
            stats,
            submissions,
            celebration,
            workers: Vec::new(),
        }
    }

    /// Subscriptions first, then the initial loads, so no write made while a
    /// load is in flight goes unseen. Failures are logged and kept in the views.
    pub async fn start(&mut self) {
        if let Ok(Some(worker)) = self.pledges.subscribe().await {
            self.workers.push(worker);
        }
        match self.stats.subscribe() {
            Ok(Some(worker)) => self.workers.push(worker),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "stats will not refresh on changes"),
        }

        let _ = self.pledges.load().await;
        let _ = self.stats.refresh().await;
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn shutdown(&mut self) {
        for worker in self.workers.drain(..) {
            worker.stop();
        }
        self.celebration.shutdown();
        self.repository.release();
        tracing::info!("pledges shut down");
    }
}

impl Drop for AppState {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.shutdown();
        }
    }
}
