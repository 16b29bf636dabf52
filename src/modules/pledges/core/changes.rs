use crate::modules::pledges::core::pledge::Pledge;
use serde::{Deserialize, Serialize};

/// Table the pledges live in on the hosted backend.
pub const PLEDGES_TABLE: &str = "pledges";

/// A row change pushed by the persistence adapter's change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PledgeChange {
    Inserted(Pledge),
    Updated(Pledge),
    Deleted { id: String },
}

impl PledgeChange {
    pub fn pledge_id(&self) -> &str {
        match self {
            PledgeChange::Inserted(p) | PledgeChange::Updated(p) => &p.id,
            PledgeChange::Deleted { id } => id,
        }
    }
}
