// Local view of the pledges table.
//
// Purpose
// - Hold the pledges the presentation layer renders, consistent with the backend.
//
// Responsibilities
// - Apply loads, local inserts and pushed changes idempotently (dedupe by id).
// - Keep one ordering policy for the whole lifetime of the store.
// - Evict the oldest pledges once the configured capacity is exceeded.
// - Remember the last load failure so it can be shown instead of thrown.
// - Replay changes that arrive while a load is in flight on top of its result.

use crate::modules::pledges::core::changes::PledgeChange;
use crate::modules::pledges::core::errors::QueryError;
use crate::modules::pledges::core::pledge::Pledge;
use crate::modules::pledges::core::ports::PledgeOrder;
use crate::modules::pledges::core::stats::{Stats, summarize};
use std::collections::HashSet;

pub const DEFAULT_CAPACITY: usize = 50;

#[derive(Debug, Clone)]
pub struct PledgeStore {
    order: PledgeOrder,
    capacity: Option<usize>,
    pledges: Vec<Pledge>,
    loading: bool,
    last_error: Option<QueryError>,
    pending_loads: usize,
    journal: Option<Vec<PledgeChange>>,
}

impl PledgeStore {
    pub fn new(order: PledgeOrder, capacity: Option<usize>) -> Self {
        Self {
            order,
            capacity,
            pledges: Vec::new(),
            loading: true,
            last_error: None,
            pending_loads: 0,
            journal: None,
        }
    }

    pub fn order(&self) -> PledgeOrder {
        self.order
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn pledges(&self) -> &[Pledge] {
        &self.pledges
    }

    pub fn len(&self) -> usize {
        self.pledges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pledges.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&QueryError> {
        self.last_error.as_ref()
    }

    /// Computed from the retained pledges only. Once the table outgrows the
    /// capacity these numbers cover the newest pledges, not the whole table.
    pub fn stats(&self) -> Stats {
        summarize(&self.pledges)
    }

    /// Marks a load as in flight. Until it lands, every change applied to the
    /// store is journaled and replayed over the loaded rows. Loads may overlap.
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.pending_loads += 1;
        self.journal.get_or_insert_with(Vec::new);
    }

    pub fn replace_all(&mut self, pledges: Vec<Pledge>) {
        let mut seen = HashSet::new();
        self.pledges = pledges
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        self.restore_order();
        self.evict_overflow();
        if let Some(journal) = self.journal.clone() {
            for change in journal {
                self.apply_change(change);
            }
        }
        self.finish_load();
        self.last_error = None;
    }

    /// The pending load failed. Keeps whatever was loaded before.
    pub fn fail_load(&mut self, error: QueryError) {
        self.finish_load();
        self.last_error = Some(error);
    }

    /// Subscribe failure. Keeps whatever was loaded before.
    pub fn record_failure(&mut self, error: QueryError) {
        self.loading = self.pending_loads > 0;
        self.last_error = Some(error);
    }

    pub fn insert_local(&mut self, pledge: Pledge) -> bool {
        self.apply(PledgeChange::Inserted(pledge))
    }

    /// Returns whether the collection changed.
    pub fn apply(&mut self, change: PledgeChange) -> bool {
        if let Some(journal) = &mut self.journal {
            journal.push(change.clone());
        }
        self.apply_change(change)
    }

    fn finish_load(&mut self) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        self.loading = self.pending_loads > 0;
        if self.pending_loads == 0 {
            self.journal = None;
        }
    }

    fn apply_change(&mut self, change: PledgeChange) -> bool {
        match change {
            PledgeChange::Inserted(pledge) => self.upsert(pledge),
            PledgeChange::Updated(pledge) => self.replace(pledge),
            PledgeChange::Deleted { id } => self.remove(&id),
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.pledges.iter().position(|p| p.id == id)
    }

    fn upsert(&mut self, pledge: Pledge) -> bool {
        if self.position(&pledge.id).is_some() {
            return self.replace(pledge);
        }
        match self.order {
            PledgeOrder::NewestFirst => {
                let at = self
                    .pledges
                    .iter()
                    .position(|p| p.created_at <= pledge.created_at)
                    .unwrap_or(self.pledges.len());
                self.pledges.insert(at, pledge);
            }
            PledgeOrder::InsertionOrder => self.pledges.push(pledge),
        }
        self.evict_overflow();
        true
    }

    fn replace(&mut self, pledge: Pledge) -> bool {
        let Some(at) = self.position(&pledge.id) else {
            return false;
        };
        if self.pledges[at] == pledge {
            return false;
        }
        self.pledges[at] = pledge;
        self.restore_order();
        true
    }

    fn remove(&mut self, id: &str) -> bool {
        let Some(at) = self.position(id) else {
            return false;
        };
        self.pledges.remove(at);
        true
    }

    fn restore_order(&mut self) {
        if self.order == PledgeOrder::NewestFirst {
            self.pledges.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
    }

    fn evict_overflow(&mut self) {
        let Some(capacity) = self.capacity else {
            return;
        };
        if self.pledges.len() <= capacity {
            return;
        }
        let excess = self.pledges.len() - capacity;
        match self.order {
            PledgeOrder::NewestFirst => self.pledges.truncate(capacity),
            PledgeOrder::InsertionOrder => {
                self.pledges.drain(..excess);
            }
        }
    }
}
