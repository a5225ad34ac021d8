use std::fmt;

use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::model::TestOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Canceled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Completed => "completed",
            SessionState::Canceled => "canceled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub session_id: String,
    pub state: SessionState,
    /// Cases selected to run after filtering.
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Project files that could not be discovered and were skipped.
    pub discovery_failures: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn recorded(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn is_success(&self) -> bool {
        self.state == SessionState::Completed && self.failed == 0 && self.discovery_failures == 0
    }
}

/// Transient state of one run: lifecycle, tallies and the cancellation flag.
pub(crate) struct ExecutionSession {
    id: String,
    state: SessionState,
    cancel: watch::Receiver<bool>,
    total: usize,
    passed: usize,
    failed: usize,
    skipped: usize,
    discovery_failures: usize,
    started: std::time::Instant,
}

impl ExecutionSession {
    pub(crate) fn new(cancel: watch::Receiver<bool>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: SessionState::Idle,
            cancel,
            total: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            discovery_failures: 0,
            started: std::time::Instant::now(),
        }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn start(&mut self, total: usize) {
        if self.state == SessionState::Idle {
            self.state = SessionState::Running;
            self.total = total;
        }
    }

    pub(crate) fn cancel_receiver(&mut self) -> &mut watch::Receiver<bool> {
        &mut self.cancel
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        *self.cancel.borrow()
    }

    /// `Running` (or a session canceled before it started) → `Canceled`.
    pub(crate) fn mark_canceled(&mut self) {
        if matches!(self.state, SessionState::Idle | SessionState::Running) {
            self.state = SessionState::Canceled;
        }
    }

    pub(crate) fn finish(&mut self) {
        if matches!(self.state, SessionState::Idle | SessionState::Running) {
            self.state = SessionState::Completed;
        }
    }

    pub(crate) fn tally(&mut self, outcome: TestOutcome) {
        match outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
            TestOutcome::Skipped => self.skipped += 1,
        }
    }

    pub(crate) fn discovery_failed(&mut self) {
        self.discovery_failures += 1;
    }

    pub(crate) fn summary(&self) -> RunSummary {
        RunSummary {
            session_id: self.id.clone(),
            state: self.state,
            total: self.total,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            discovery_failures: self.discovery_failures,
            duration_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_completed() {
        let (_tx, rx) = watch::channel(false);
        let mut s = ExecutionSession::new(rx);
        assert_eq!(s.summary().state, SessionState::Idle);
        s.start(2);
        assert_eq!(s.summary().state, SessionState::Running);
        s.tally(TestOutcome::Passed);
        s.tally(TestOutcome::Skipped);
        s.finish();
        let sum = s.summary();
        assert_eq!(sum.state, SessionState::Completed);
        assert_eq!(sum.recorded(), 2);
        assert!(sum.is_success());
    }

    #[test]
    fn discovery_failure_is_not_success() {
        let (_tx, rx) = watch::channel(false);
        let mut s = ExecutionSession::new(rx);
        s.discovery_failed();
        s.start(0);
        s.finish();
        let sum = s.summary();
        assert_eq!(sum.state, SessionState::Completed);
        assert_eq!(sum.discovery_failures, 1);
        assert!(!sum.is_success());
    }

    #[test]
    fn canceled_is_terminal() {
        let (tx, rx) = watch::channel(false);
        let mut s = ExecutionSession::new(rx);
        s.start(3);
        tx.send_replace(true);
        assert!(s.cancel_requested());
        s.mark_canceled();
        s.finish();
        assert_eq!(s.summary().state, SessionState::Canceled);
        assert!(!s.summary().is_success());
    }
}
