// In memory implementation of the pledge repository and its change feed.
//
// Purpose
// - Stand in for the hosted realtime backend in tests and local runs.
//
// Responsibilities
// - Store pledges in memory and assign ids and timestamps on insert.
// - Push a change message for every insert, update and delete, including
//   those made by other clients.
// - Acquire the realtime channel on first subscription and release it on shutdown.

use crate::modules::pledges::core::changes::{PLEDGES_TABLE, PledgeChange};
use crate::modules::pledges::core::errors::{QueryError, WriteError};
use crate::modules::pledges::core::pledge::{NewPledge, Pledge};
use crate::modules::pledges::core::ports::{PledgeChangeFeed, PledgeOrder, PledgeRepository};
use crate::shared::infrastructure::change_feed::{ChangeChannel, Subscription};
use crate::shared::infrastructure::lazy_resource::LazyResource;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryPledgeRepository {
    rows: RwLock<Vec<Pledge>>,
    realtime: LazyResource<ChangeChannel<PledgeChange>>,
    realtime_enabled: bool,
    is_offline: bool,
    delay_insert_ms: AtomicU64,
    insert_calls: AtomicUsize,
}

impl Default for InMemoryPledgeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPledgeRepository {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
            realtime: LazyResource::new(),
            realtime_enabled: true,
            is_offline: false,
            delay_insert_ms: AtomicU64::new(0),
            insert_calls: AtomicUsize::new(0),
        }
    }

    /// A backend that only supports load and insert.
    pub fn without_realtime() -> Self {
        Self {
            realtime_enabled: false,
            ..Self::new()
        }
    }

    pub fn with_pledges(pledges: Vec<Pledge>) -> Self {
        Self {
            rows: RwLock::new(pledges),
            ..Self::new()
        }
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    pub fn set_delay_insert_ms(&self, ms: u64) {
        self.delay_insert_ms.store(ms, Ordering::SeqCst);
    }

    /// Number of `insert_pledge` calls received, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub fn is_realtime_acquired(&self) -> bool {
        self.realtime.is_acquired()
    }

    /// Another client inserted a row.
    pub async fn insert_external(&self, pledge: Pledge) {
        self.rows.write().await.push(pledge.clone());
        self.publish(PledgeChange::Inserted(pledge));
    }

    /// Another client edited a row. Returns `false` when the id is unknown.
    pub async fn update_pledge(&self, pledge: Pledge) -> bool {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.iter_mut().find(|p| p.id == pledge.id) else {
            return false;
        };
        *row = pledge.clone();
        drop(rows);
        self.publish(PledgeChange::Updated(pledge));
        true
    }

    /// Another client deleted a row. Returns `false` when the id is unknown.
    pub async fn delete_pledge(&self, id: &str) -> bool {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|p| p.id != id);
        if rows.len() == before {
            return false;
        }
        drop(rows);
        self.publish(PledgeChange::Deleted { id: id.to_string() });
        true
    }

    fn publish(&self, change: PledgeChange) {
        if let Some(channel) = self.realtime.get() {
            let delivered = channel.publish(change);
            tracing::debug!(delivered, "change published");
        }
    }
}

#[async_trait::async_trait]
impl PledgeRepository for InMemoryPledgeRepository {
    async fn list_pledges(
        &self,
        order: PledgeOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Pledge>, QueryError> {
        if self.is_offline {
            return Err(QueryError::Offline);
        }
        let rows = self.rows.read().await;
        let mut items: Vec<Pledge> = match order {
            PledgeOrder::NewestFirst => {
                let mut items: Vec<Pledge> = rows.iter().rev().cloned().collect();
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                items
            }
            PledgeOrder::InsertionOrder => rows.clone(),
        };
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn insert_pledge(&self, pledge: NewPledge) -> Result<Pledge, WriteError> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_insert_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.is_offline {
            return Err(WriteError::Offline);
        }
        if pledge.name.trim().is_empty() {
            return Err(WriteError::Rejected("name violates not-empty constraint".into()));
        }
        if !(pledge.monthly_amount.is_finite() && pledge.monthly_amount > 0.0) {
            return Err(WriteError::Rejected(
                "monthly_amount violates positive constraint".into(),
            ));
        }

        let stored = pledge.into_pledge(Uuid::now_v7().to_string(), Utc::now().timestamp_millis());
        self.rows.write().await.push(stored.clone());
        self.publish(PledgeChange::Inserted(stored.clone()));
        Ok(stored)
    }

    fn change_feed(&self) -> Option<&dyn PledgeChangeFeed> {
        if self.realtime_enabled {
            Some(self)
        } else {
            None
        }
    }

    /// Open subscriptions end.
    fn release(&self) {
        if let Some(channel) = self.realtime.release() {
            channel.close();
            tracing::info!(channel = %channel.name(), "realtime channel released");
        }
    }
}

impl PledgeChangeFeed for InMemoryPledgeRepository {
    fn subscribe_to_changes(&self, table: &str) -> Result<Subscription<PledgeChange>, QueryError> {
        if self.is_offline {
            return Err(QueryError::Offline);
        }
        if table != PLEDGES_TABLE {
            return Err(QueryError::Unavailable(format!("unknown table {table}")));
        }
        let channel = self
            .realtime
            .get_or_init(|| ChangeChannel::new(format!("{table}-changes")));
        Ok(channel.subscribe())
    }
}

#[cfg(test)]
mod in_memory_pledge_repository_tests {
    use super::*;
    use crate::tests::fixtures::pledges::PledgeBuilder;
    use rstest::{fixture, rstest};

    fn new_pledge(name: &str, amount: f64) -> NewPledge {
        NewPledge {
            name: name.to_string(),
            monthly_amount: amount,
        }
    }

    #[fixture]
    fn before_each() -> InMemoryPledgeRepository {
        InMemoryPledgeRepository::with_pledges(vec![
            PledgeBuilder::new()
                .id("1")
                .monthly_amount(10.0)
                .created_at(1_000)
                .build(),
            PledgeBuilder::new()
                .id("2")
                .monthly_amount(20.0)
                .created_at(2_000)
                .build(),
            PledgeBuilder::new()
                .id("3")
                .monthly_amount(30.0)
                .created_at(3_000)
                .build(),
        ])
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_list_newest_first_with_a_limit(before_each: InMemoryPledgeRepository) {
        let items = before_each
            .list_pledges(PledgeOrder::NewestFirst, Some(2))
            .await
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2"]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_list_in_insertion_order(before_each: InMemoryPledgeRepository) {
        let items = before_each
            .list_pledges(PledgeOrder::InsertionOrder, None)
            .await
            .unwrap();
        let ids: Vec<&str> = items.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_assign_id_and_timestamp_on_insert() {
        let repository = InMemoryPledgeRepository::new();
        let stored = repository
            .insert_pledge(new_pledge("Alice", 12.0))
            .await
            .unwrap();
        assert!(!stored.id.is_empty());
        assert!(stored.created_at > 0);
        assert_eq!(stored.name, "Alice");
        assert_eq!(repository.insert_calls(), 1);
        let items = repository
            .list_pledges(PledgeOrder::NewestFirst, None)
            .await
            .unwrap();
        assert_eq!(items, vec![stored]);
    }

    #[rstest]
    #[case("", 12.0)]
    #[case("Alice", 0.0)]
    #[case("Alice", -5.0)]
    #[case("Alice", f64::NAN)]
    #[tokio::test]
    async fn it_should_reject_rows_that_violate_constraints(
        #[case] name: &str,
        #[case] amount: f64,
    ) {
        let repository = InMemoryPledgeRepository::new();
        let result = repository.insert_pledge(new_pledge(name, amount)).await;
        assert!(matches!(result, Err(WriteError::Rejected(_))));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_if_the_backend_is_offline(mut before_each: InMemoryPledgeRepository) {
        before_each.toggle_offline();
        assert_eq!(
            before_each.list_pledges(PledgeOrder::NewestFirst, None).await,
            Err(QueryError::Offline)
        );
        assert_eq!(
            before_each.insert_pledge(new_pledge("Alice", 12.0)).await,
            Err(WriteError::Offline)
        );
        assert!(before_each.subscribe_to_changes(PLEDGES_TABLE).is_err());
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_push_changes_to_subscribers(before_each: InMemoryPledgeRepository) {
        let mut subscription = before_each.subscribe_to_changes(PLEDGES_TABLE).unwrap();
        let stored = before_each
            .insert_pledge(new_pledge("Dana", 7.0))
            .await
            .unwrap();
        let updated = PledgeBuilder::new()
            .id("1")
            .monthly_amount(11.0)
            .created_at(1_000)
            .build();
        assert!(before_each.update_pledge(updated.clone()).await);
        assert!(before_each.delete_pledge("2").await);

        assert_eq!(subscription.recv().await, Some(PledgeChange::Inserted(stored)));
        assert_eq!(subscription.recv().await, Some(PledgeChange::Updated(updated)));
        assert_eq!(
            subscription.recv().await,
            Some(PledgeChange::Deleted { id: "2".into() })
        );
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_not_publish_changes_for_unknown_ids(before_each: InMemoryPledgeRepository) {
        let mut subscription = before_each.subscribe_to_changes(PLEDGES_TABLE).unwrap();
        assert!(!before_each.delete_pledge("9").await);
        assert!(
            !before_each
                .update_pledge(PledgeBuilder::new().id("9").build())
                .await
        );
        let external = PledgeBuilder::new().id("4").created_at(4_000).build();
        before_each.insert_external(external.clone()).await;
        assert_eq!(subscription.recv().await, Some(PledgeChange::Inserted(external)));
    }

    #[rstest]
    fn it_should_refuse_unknown_tables(before_each: InMemoryPledgeRepository) {
        assert!(matches!(
            before_each.subscribe_to_changes("votes"),
            Err(QueryError::Unavailable(_))
        ));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_acquire_the_channel_lazily_and_release_it_once(
        before_each: InMemoryPledgeRepository,
    ) {
        assert!(!before_each.is_realtime_acquired());
        let mut subscription = before_each.subscribe_to_changes(PLEDGES_TABLE).unwrap();
        assert!(before_each.is_realtime_acquired());
        before_each.release();
        before_each.release();
        assert!(!before_each.is_realtime_acquired());
        assert_eq!(subscription.recv().await, None);
    }

    #[rstest]
    fn it_should_hide_the_change_feed_when_realtime_is_disabled() {
        let repository = InMemoryPledgeRepository::without_realtime();
        assert!(repository.change_feed().is_none());
        assert!(InMemoryPledgeRepository::new().change_feed().is_some());
    }
}
