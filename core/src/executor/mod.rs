//! The test executor.
//!
//! `run_tests` / `run_sources` block the calling thread on a private
//! current-thread runtime so a host can call `cancel()` from another thread.
//! Hosts already inside tokio use the `_async` variants.
//!
//! Cases run one at a time. Cancellation is checked between cases and raced
//! against the running child, which is killed when it fires. After
//! cancellation nothing more is recorded for the session.

mod outcome;
mod session;

use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

pub use session::{RunSummary, SessionState};

use crate::config::ExecutorConfig;
use crate::context::RunContext;
use crate::discovery::discover_project;
use crate::error::{DiscoveryError, ExecutorError, LaunchError};
use crate::model::{TestCase, TestResult};
use crate::recorder::TestRecorder;
use crate::runner::{run_process, FrameworkRegistry, ProcessLimits, Termination};

use outcome::Timing;
use session::ExecutionSession;

pub struct TestExecutor {
    config: ExecutorConfig,
    frameworks: FrameworkRegistry,
    active: Mutex<Option<watch::Sender<bool>>>,
}

/// Unregisters the running session when dropped, so a canceled or failed
/// run never blocks the next one.
struct ActiveGuard<'a> {
    active: &'a Mutex<Option<watch::Sender<bool>>>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl TestExecutor {
    pub fn new(config: ExecutorConfig, frameworks: FrameworkRegistry) -> Self {
        Self {
            config,
            frameworks,
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn frameworks(&self) -> &FrameworkRegistry {
        &self.frameworks
    }

    pub fn is_running(&self) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Runs `cases` and records one result per completed case. Blocks the caller.
    ///
    /// Must not be called from inside a tokio runtime; use [`Self::run_tests_async`] there.
    pub fn run_tests(
        &self,
        cases: &[TestCase],
        ctx: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> Result<RunSummary, ExecutorError> {
        block_on(self.run_tests_async(cases, ctx, recorder))
    }

    /// Discovers the cases of every project file, then runs them. Blocks the caller.
    pub fn run_sources(
        &self,
        project_files: &[PathBuf],
        ctx: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> Result<RunSummary, ExecutorError> {
        block_on(self.run_sources_async(project_files, ctx, recorder))
    }

    pub async fn run_tests_async(
        &self,
        cases: &[TestCase],
        ctx: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> Result<RunSummary, ExecutorError> {
        let (mut session, _guard) = self.begin()?;
        self.execute(&mut session, cases, ctx, recorder).await?;
        Ok(self.end(&session))
    }

    pub async fn run_sources_async(
        &self,
        project_files: &[PathBuf],
        ctx: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> Result<RunSummary, ExecutorError> {
        let (mut session, _guard) = self.begin()?;
        let limits = self.discovery_limits();

        let mut cases = Vec::new();
        for path in project_files {
            if session.cancel_requested() {
                break;
            }
            let discovered =
                discover_project(path, &self.frameworks, limits, session.cancel_receiver()).await;
            match discovered {
                Ok(found) => cases.extend(found),
                Err(DiscoveryError::Canceled) => break,
                Err(e) => {
                    session.discovery_failed();
                    tracing::error!(
                        target: "testexec.discovery",
                        session_id = %session.id(),
                        path = %path.display(),
                        error = %e,
                        "project discovery failed, skipping project"
                    );
                }
            }
        }

        if session.cancel_requested() {
            session.mark_canceled();
            return Ok(self.end(&session));
        }

        self.execute(&mut session, &cases, ctx, recorder).await?;
        Ok(self.end(&session))
    }

    /// Discovers one project outside of any session; cannot be canceled.
    pub async fn discover(&self, project_file: &Path) -> Result<Vec<TestCase>, DiscoveryError> {
        let (_tx, mut rx) = watch::channel(false);
        discover_project(project_file, &self.frameworks, self.discovery_limits(), &mut rx).await
    }

    /// Requests that the running session stop. No-op while idle.
    pub fn cancel(&self) {
        let active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active.as_ref() {
            Some(tx) => {
                tx.send_replace(true);
                tracing::info!(target: "testexec.executor", "cancellation requested");
            }
            None => {
                tracing::debug!(target: "testexec.executor", "cancel ignored, no session running");
            }
        }
    }

    fn begin(&self) -> Result<(ExecutionSession, ActiveGuard<'_>), ExecutorError> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if active.is_some() {
            return Err(ExecutorError::Busy);
        }
        let (tx, rx) = watch::channel(false);
        *active = Some(tx);
        Ok((
            ExecutionSession::new(rx),
            ActiveGuard {
                active: &self.active,
            },
        ))
    }

    fn end(&self, session: &ExecutionSession) -> RunSummary {
        let summary = session.summary();
        tracing::info!(
            target: "testexec.executor",
            session_id = %summary.session_id,
            state = %summary.state,
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            discovery_failures = summary.discovery_failures,
            duration_ms = summary.duration_ms,
            "session finished"
        );
        summary
    }

    async fn execute(
        &self,
        session: &mut ExecutionSession,
        cases: &[TestCase],
        ctx: &RunContext,
        recorder: &dyn TestRecorder,
    ) -> Result<(), ExecutorError> {
        let selected = select_cases(cases, ctx);
        self.ensure_runners(&selected)?;

        session.start(selected.len());
        tracing::info!(
            target: "testexec.executor",
            session_id = %session.id(),
            total = selected.len(),
            "session started"
        );

        for case in selected {
            if session.cancel_requested() {
                session.mark_canceled();
                break;
            }

            recorder.record_start(case);
            let ran = self.run_case(case, ctx, session.cancel_receiver()).await;
            let Some(result) = ran else {
                tracing::info!(
                    target: "testexec.executor",
                    session_id = %session.id(),
                    fqn = %case.fully_qualified_name(),
                    "test canceled"
                );
                session.mark_canceled();
                break;
            };

            if session.cancel_requested() {
                tracing::debug!(
                    target: "testexec.executor",
                    fqn = %case.fully_qualified_name(),
                    "result dropped, session canceled while it finished"
                );
                session.mark_canceled();
                break;
            }

            let outcome = result.outcome;
            tracing::info!(
                target: "testexec.executor",
                session_id = %session.id(),
                fqn = %case.fully_qualified_name(),
                outcome = %outcome,
                exit_code = ?result.exit_code,
                duration_ms = result.duration_ms,
                "test finished"
            );
            session.tally(outcome);
            recorder.record_result(result);
            recorder.record_end(case, outcome);
        }

        session.finish();
        Ok(())
    }

    /// Fails the session up front when a framework's runner binary is missing.
    fn ensure_runners(&self, cases: &[&TestCase]) -> Result<(), ExecutorError> {
        let mut checked = HashSet::new();
        for case in cases {
            if !checked.insert(case.framework()) {
                continue;
            }
            // unknown frameworks are reported per case
            let Some(framework) = self.frameworks.get(case.framework()) else {
                continue;
            };
            if let Err(source) = which::which(framework.program()) {
                tracing::error!(
                    target: "testexec.executor",
                    framework = %case.framework(),
                    program = %framework.program(),
                    "test runner not found"
                );
                return Err(ExecutorError::RunnerNotFound {
                    framework: case.framework().to_string(),
                    program: framework.program().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// `None` when the case was canceled before it completed.
    async fn run_case(
        &self,
        case: &TestCase,
        ctx: &RunContext,
        cancel: &mut watch::Receiver<bool>,
    ) -> Option<TestResult> {
        let timing = Timing::now();
        let Some(framework) = self.frameworks.get(case.framework()) else {
            let err = LaunchError::UnknownFramework(case.framework().to_string());
            return Some(outcome::launch_failure(case, timing, &err));
        };

        let spec = match framework.plan(case, ctx) {
            Ok(spec) => spec,
            Err(e) => return Some(outcome::launch_failure(case, timing, &e)),
        };

        let timeout = ctx
            .test_timeout()
            .unwrap_or_else(|| self.config.test_timeout());
        let limits = ProcessLimits {
            timeout,
            capture_bytes: self.config.capture_bytes,
            drain_grace: self.config.drain_grace(),
        };

        let out = match run_process(&spec, limits, cancel).await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!(
                    target: "testexec.executor",
                    fqn = %case.fully_qualified_name(),
                    error = %e,
                    "failed to launch test"
                );
                return Some(outcome::launch_failure(case, timing, &e));
            }
        };

        match out.termination {
            Termination::Exited(code) => {
                Some(outcome::from_exit(case, timing, code, &out, &self.config))
            }
            Termination::TimedOut => {
                tracing::warn!(
                    target: "testexec.executor",
                    fqn = %case.fully_qualified_name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "test timed out"
                );
                Some(outcome::timed_out(case, timing, timeout, &out, &self.config))
            }
            Termination::Canceled => None,
        }
    }

    fn discovery_limits(&self) -> ProcessLimits {
        ProcessLimits {
            timeout: self.config.discovery_timeout(),
            capture_bytes: self.config.capture_bytes,
            drain_grace: self.config.drain_grace(),
        }
    }
}

/// Applies the context's filters and drops repeated cases, keeping input order.
fn select_cases<'a>(cases: &'a [TestCase], ctx: &RunContext) -> Vec<&'a TestCase> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(cases.len());
    for case in cases {
        if !ctx.matches(case) {
            continue;
        }
        if !seen.insert((case.source(), case.fully_qualified_name())) {
            tracing::debug!(
                target: "testexec.executor",
                fqn = %case.fully_qualified_name(),
                "duplicate test case ignored"
            );
            continue;
        }
        out.push(case);
    }
    out
}

fn block_on<T, F>(fut: F) -> Result<T, ExecutorError>
where
    F: Future<Output = Result<T, ExecutorError>>,
{
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(ExecutorError::Runtime)?;
    rt.block_on(fut)
}
