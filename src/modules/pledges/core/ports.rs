// Ports define what the pledge view model needs from the persistence backend.
//
// Responsibilities
// - Describe the capability set {load, insert, subscribe?} as traits.
// - Keep the store and the submission controller independent of any backend.
//
// Boundaries
// - No concrete input or output here. Adapters implement these traits in the adapters layer.

use crate::modules::pledges::core::changes::PledgeChange;
use crate::modules::pledges::core::errors::{QueryError, WriteError};
use crate::modules::pledges::core::pledge::{NewPledge, Pledge};
use crate::shared::infrastructure::change_feed::Subscription;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How a pledge collection is ordered. A store holds exactly one of these for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PledgeOrder {
    /// Strictly by `created_at`, newest first.
    NewestFirst,
    /// Oldest insert first.
    InsertionOrder,
}

#[async_trait]
pub trait PledgeRepository: Send + Sync {
    /// `limit` keeps the first `limit` pledges under `order`; `None` returns all of them.
    async fn list_pledges(
        &self,
        order: PledgeOrder,
        limit: Option<usize>,
    ) -> Result<Vec<Pledge>, QueryError>;

    async fn insert_pledge(&self, pledge: NewPledge) -> Result<Pledge, WriteError>;

    /// Realtime change notifications, when the backend offers them.
    fn change_feed(&self) -> Option<&dyn PledgeChangeFeed> {
        None
    }

    /// Tears down process-wide resources such as the realtime channel. Safe to call twice.
    fn release(&self) {}
}

pub trait PledgeChangeFeed: Send + Sync {
    fn subscribe_to_changes(&self, table: &str) -> Result<Subscription<PledgeChange>, QueryError>;
}
