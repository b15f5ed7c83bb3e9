//! Busy / done state of a single export action.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::error::ExportError;
use crate::error_slot::ErrorSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Done,
    /// The last run failed; the error went to the [`ErrorSlot`].
    Failed,
}

/// `Idle → Running → (Done | Failed)`.
///
/// Triggering again while running is allowed. The state then reflects
/// whichever run finished last.
#[derive(Debug)]
pub struct ExportRunState {
    phase: watch::Sender<RunPhase>,
}

impl Default for ExportRunState {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportRunState {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(RunPhase::Idle);
        Self { phase }
    }

    pub fn phase(&self) -> RunPhase {
        *self.phase.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == RunPhase::Running
    }

    pub fn is_done(&self) -> bool {
        self.phase() == RunPhase::Done
    }

    pub fn subscribe(&self) -> watch::Receiver<RunPhase> {
        self.phase.subscribe()
    }

    pub fn start(&self) {
        if self.is_running() {
            debug!("export triggered while a previous run is still in flight");
        }
        self.phase.send_replace(RunPhase::Running);
    }

    pub fn succeed(&self) {
        self.phase.send_replace(RunPhase::Done);
    }

    /// Report `failure` to `errors` and leave the running state.
    pub fn fail(&self, failure: ExportError, errors: &ErrorSlot) -> Arc<ExportError> {
        let failure = errors.report(failure);
        self.phase.send_replace(RunPhase::Failed);
        failure
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path() {
        let state = ExportRunState::new();
        assert!(!state.is_running() && !state.is_done());
        state.start();
        assert!(state.is_running());
        assert!(!state.is_done());
        state.succeed();
        assert!(state.is_done());
        assert!(!state.is_running());
    }

    #[test]
    fn failure_path_reports_once() {
        let state = ExportRunState::new();
        let errors = ErrorSlot::new();
        let mut phases = state.subscribe();

        state.start();
        state.fail(ExportError::WorkerUnavailable, &errors);

        assert_eq!(state.phase(), RunPhase::Failed);
        assert!(!state.is_running());
        assert!(!state.is_done());
        assert_eq!(errors.report_count(), 1);
        assert!(phases.has_changed().expect("sender alive"));
        assert_eq!(*phases.borrow_and_update(), RunPhase::Failed);
    }

    #[test]
    fn retrigger_after_done_clears_done() {
        let state = ExportRunState::new();
        state.start();
        state.succeed();
        state.start();
        assert!(state.is_running());
        assert!(!state.is_done());
    }
}
