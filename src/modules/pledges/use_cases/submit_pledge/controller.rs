// Single-flight submission of one pledge at a time.
//
// Purpose
// - Turn the visitor's form into at most one write against the persistence adapter.
//
// Responsibilities
// - Validate before any write; rejected input never reaches the adapter.
// - Refuse new submissions while one is in flight, including while a confirmed
//   write is still being folded into the store.
// - Return to idle when a submission is dropped halfway.
// - On success: reset the form, lock the session, insert the confirmed pledge
//   into the store and fire the celebration.
// - On failure: go back to idle with the error so the visitor can retry.
//
// The session lock lives in process memory. A new controller (a reload) starts unlocked.

use crate::modules::pledges::core::errors::{SubmitError, ValidationError};
use crate::modules::pledges::core::pledge::Pledge;
use crate::modules::pledges::core::ports::PledgeRepository;
use crate::modules::pledges::use_cases::submit_pledge::celebration::Celebration;
use crate::modules::pledges::use_cases::submit_pledge::command::SubmitPledge;
use crate::modules::pledges::use_cases::submit_pledge::decide::decide_submit;
use crate::modules::pledges::use_cases::submit_pledge::decision::Decision;
use crate::modules::pledges::use_cases::track_pledges::handler::PledgeSync;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

const TRANSITION_BUFFER: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Validating,
    Submitting,
    Succeeded,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionPolicy {
    pub one_per_session: bool,
    /// Artificial wait before the write, for perceived latency on instant backends.
    pub submit_delay: Duration,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self {
            one_per_session: true,
            submit_delay: Duration::ZERO,
        }
    }
}

struct Session {
    state: SubmissionState,
    has_submitted: bool,
    form: SubmitPledge,
}

pub struct SubmissionController<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    repository: Arc<R>,
    sync: Arc<PledgeSync<R>>,
    celebration: Arc<Celebration>,
    policy: SubmissionPolicy,
    session: Mutex<Session>,
    transitions: broadcast::Sender<SubmissionState>,
}

/// Owned by the one submission allowed in flight. Dropping it, on any path,
/// hands the controller back in `Idle`.
struct Flight<'a, R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    controller: &'a SubmissionController<R>,
}

impl<R> Drop for Flight<'_, R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    fn drop(&mut self) {
        let mut session = self.controller.session();
        self.controller.transition(&mut session, SubmissionState::Idle);
    }
}

impl<R> SubmissionController<R>
where
    R: PledgeRepository + ?Sized + 'static,
{
    pub fn new(
        repository: Arc<R>,
        sync: Arc<PledgeSync<R>>,
        celebration: Arc<Celebration>,
        policy: SubmissionPolicy,
    ) -> Self {
        let (transitions, _) = broadcast::channel(TRANSITION_BUFFER);
        Self {
            repository,
            sync,
            celebration,
            policy,
            session: Mutex::new(Session {
                state: SubmissionState::Idle,
                has_submitted: false,
                form: SubmitPledge::default(),
            }),
            transitions,
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, session: &mut Session, state: SubmissionState) {
        session.state = state;
        let _ = self.transitions.send(state);
    }

    /// Every state the controller passes through, `Rejected` included.
    pub fn transitions(&self) -> broadcast::Receiver<SubmissionState> {
        self.transitions.subscribe()
    }

    pub fn state(&self) -> SubmissionState {
        self.session().state
    }

    pub fn has_submitted(&self) -> bool {
        self.session().has_submitted
    }

    pub fn form(&self) -> SubmitPledge {
        self.session().form.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.session().form.name = name.into();
    }

    pub fn set_amount(&self, amount: impl Into<String>) {
        self.session().form.monthly_amount = amount.into();
    }

    pub fn celebration(&self) -> &Celebration {
        &self.celebration
    }

    pub fn can_submit(&self) -> bool {
        let session = self.session();
        session.state == SubmissionState::Idle
            && session.form.is_filled_in()
            && !(self.policy.one_per_session && session.has_submitted)
    }

    pub async fn submit_form(&self) -> Result<Pledge, SubmitError> {
        let command = self.form();
        self.submit(command).await
    }

    pub async fn submit(&self, command: SubmitPledge) -> Result<Pledge, SubmitError> {
        let (pledge, flight) = {
            let mut session = self.session();
            if session.state != SubmissionState::Idle {
                tracing::debug!(state = ?session.state, "submission ignored, another one is in flight");
                return Err(ValidationError::SubmissionPending.into());
            }
            self.transition(&mut session, SubmissionState::Validating);
            let locked = self.policy.one_per_session && session.has_submitted;
            match decide_submit(&command, locked) {
                Decision::Accepted { pledge } => {
                    self.transition(&mut session, SubmissionState::Submitting);
                    (pledge, Flight { controller: self })
                }
                Decision::Rejected { reason } => {
                    self.transition(&mut session, SubmissionState::Rejected);
                    tracing::debug!(reason = %reason, "submission rejected");
                    self.transition(&mut session, SubmissionState::Idle);
                    return Err(reason.into());
                }
            }
        };

        if !self.policy.submit_delay.is_zero() {
            tokio::time::sleep(self.policy.submit_delay).await;
        }

        let stored = match self.repository.insert_pledge(pledge).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "pledge submission failed");
                return Err(e.into());
            }
        };
        {
            let mut session = self.session();
            self.transition(&mut session, SubmissionState::Succeeded);
            session.has_submitted = true;
            session.form = SubmitPledge::default();
        }
        self.sync.insert_local(stored.clone()).await;
        self.celebration.trigger();
        tracing::info!(pledge_id = %stored.id, monthly_amount = stored.monthly_amount, "pledge submitted");
        drop(flight);
        Ok(stored)
    }
}
