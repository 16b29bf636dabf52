// Stats aggregation over a set of pledges.
//
// Pure and deterministic: the same pledges always produce the same numbers,
// and an empty set produces all zeros.

use crate::modules::pledges::core::pledge::Pledge;
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub count: usize,
    pub total_monthly: f64,
    pub average_monthly: f64,
    pub projected_annual: f64,
}

impl Stats {
    pub fn from_totals(count: usize, total_monthly: f64) -> Self {
        let average_monthly = if count > 0 {
            total_monthly / count as f64
        } else {
            0.0
        };
        Self {
            count,
            total_monthly,
            average_monthly,
            projected_annual: total_monthly * MONTHS_PER_YEAR,
        }
    }
}

pub fn summarize(pledges: &[Pledge]) -> Stats {
    let total = pledges.iter().map(|p| p.monthly_amount).sum();
    Stats::from_totals(pledges.len(), total)
}
