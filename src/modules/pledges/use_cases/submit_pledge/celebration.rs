// One-shot success signal for the presentation layer.
//
// The success banner shows at once and clears after a while; the badge starts
// spinning a moment later and stops on its own. Both are pure timing effects.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CelebrationState {
    pub show_success: bool,
    pub badge_spinning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CelebrationTimings {
    pub success_for: Duration,
    pub spin_delay: Duration,
    pub spin_for: Duration,
}

impl Default for CelebrationTimings {
    fn default() -> Self {
        Self {
            success_for: Duration::from_millis(3000),
            spin_delay: Duration::from_millis(50),
            spin_for: Duration::from_millis(2000),
        }
    }
}

pub struct Celebration {
    state: watch::Sender<CelebrationState>,
    timings: CelebrationTimings,
    timers: Mutex<Vec<JoinHandle<()>>>,
}

impl Default for Celebration {
    fn default() -> Self {
        Self::new(CelebrationTimings::default())
    }
}

impl Celebration {
    pub fn new(timings: CelebrationTimings) -> Self {
        let (state, _) = watch::channel(CelebrationState::default());
        Self {
            state,
            timings,
            timers: Mutex::new(Vec::new()),
        }
    }

    /// Restarts the sequence if one is already running. Needs a tokio runtime.
    pub fn trigger(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        for timer in timers.drain(..) {
            timer.abort();
        }
        self.state.send_replace(CelebrationState {
            show_success: true,
            badge_spinning: false,
        });

        let spin = self.state.clone();
        let CelebrationTimings {
            success_for,
            spin_delay,
            spin_for,
        } = self.timings;
        timers.push(tokio::spawn(async move {
            tokio::time::sleep(spin_delay).await;
            spin.send_modify(|s| s.badge_spinning = true);
            tokio::time::sleep(spin_for).await;
            spin.send_modify(|s| s.badge_spinning = false);
        }));

        let banner = self.state.clone();
        timers.push(tokio::spawn(async move {
            tokio::time::sleep(success_for).await;
            banner.send_modify(|s| s.show_success = false);
        }));
    }

    pub fn current(&self) -> CelebrationState {
        *self.state.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<CelebrationState> {
        self.state.subscribe()
    }

    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().unwrap_or_else(PoisonError::into_inner);
        for timer in timers.drain(..) {
            timer.abort();
        }
        self.state.send_replace(CelebrationState::default());
    }
}

impl Drop for Celebration {
    fn drop(&mut self) {
        let timers = self.timers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for timer in timers.drain(..) {
            timer.abort();
        }
    }
}
