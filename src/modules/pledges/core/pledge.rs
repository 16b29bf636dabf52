use serde::{Deserialize, Serialize};

/// Lower end of the price range offered by the form slider.
pub const MIN_SUGGESTED_AMOUNT: u32 = 5;
/// Upper end of the price range offered by the form slider.
pub const MAX_SUGGESTED_AMOUNT: u32 = 19;
/// Slider position before the visitor touches it.
pub const DEFAULT_AMOUNT: u32 = 12;

/// Input hint for the amount field. The range only guides; any positive amount is accepted.
pub fn amount_hint() -> String {
    format!(
        "monthly amount, suggested {MIN_SUGGESTED_AMOUNT} to {MAX_SUGGESTED_AMOUNT} (default {DEFAULT_AMOUNT})"
    )
}

/// One submitted pledge as stored by the persistence adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pledge {
    pub id: String,
    pub name: String,
    pub monthly_amount: f64,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Write request for a pledge that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPledge {
    pub name: String,
    pub monthly_amount: f64,
}

impl NewPledge {
    pub fn into_pledge(self, id: impl Into<String>, created_at: i64) -> Pledge {
        Pledge {
            id: id.into(),
            name: self.name,
            monthly_amount: self.monthly_amount,
            created_at,
        }
    }
}
