// Process-wide resource with explicit lazy acquisition and idempotent release.
//
// Owned by whoever needs it and passed around explicitly; never a global.

use std::sync::{Arc, Mutex, PoisonError};

pub struct LazyResource<T> {
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> Default for LazyResource<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyResource<T> {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Acquires the resource on first use; later calls share the same instance.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| Arc::new(init())).clone()
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_acquired(&self) -> bool {
        self.get().is_some()
    }

    /// Hands the resource back for teardown. Returns `None` when nothing is held,
    /// so releasing twice is harmless. A later `get_or_init` acquires a fresh one.
    pub fn release(&self) -> Option<Arc<T>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}
