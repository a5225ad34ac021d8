use chrono::{DateTime, Utc};

use crate::config::ExecutorConfig;
use crate::model::{MessageCategory, TestCase, TestOutcome, TestResult, TestResultMessage};
use crate::runner::exit::describe_exit;
use crate::runner::marker::extract_report;
use crate::runner::ProcessOutcome;

pub(crate) struct Timing {
    pub start: DateTime<Utc>,
    pub clock: std::time::Instant,
}

impl Timing {
    pub(crate) fn now() -> Self {
        Self {
            start: Utc::now(),
            clock: std::time::Instant::now(),
        }
    }
}

/// Outcome of a runner that exited on its own.
pub(crate) fn from_exit(
    case: &TestCase,
    timing: Timing,
    code: i32,
    out: &ProcessOutcome,
    cfg: &ExecutorConfig,
) -> TestResult {
    let (stdout, report) = extract_report(&out.stdout, &cfg.result_marker);
    let outcome = match &report {
        Some(r) => r.outcome,
        None if code == 0 => TestOutcome::Passed,
        None => TestOutcome::Failed,
    };

    let mut messages = stream_messages(&stdout, out, cfg);
    match report.and_then(|r| r.message) {
        Some(msg) => messages.push(TestResultMessage::new(MessageCategory::AdditionalInfo, msg)),
        None if outcome == TestOutcome::Failed && code != 0 => {
            messages.push(TestResultMessage::new(
                MessageCategory::AdditionalInfo,
                describe_exit(code),
            ));
        }
        None => {}
    }

    finish(case, timing, outcome, messages, Some(code))
}

pub(crate) fn timed_out(
    case: &TestCase,
    timing: Timing,
    timeout: std::time::Duration,
    out: &ProcessOutcome,
    cfg: &ExecutorConfig,
) -> TestResult {
    let (stdout, _) = extract_report(&out.stdout, &cfg.result_marker);
    let mut messages = stream_messages(&stdout, out, cfg);
    messages.push(TestResultMessage::new(
        MessageCategory::Error,
        format!("test timed out after {}ms", timeout.as_millis()),
    ));
    finish(case, timing, TestOutcome::Failed, messages, None)
}

/// A case that could not be launched at all.
pub(crate) fn launch_failure(
    case: &TestCase,
    timing: Timing,
    error: &dyn std::error::Error,
) -> TestResult {
    let mut text = error.to_string();
    let mut source = error.source();
    while let Some(s) = source {
        text.push_str(": ");
        text.push_str(&s.to_string());
        source = s.source();
    }
    finish(
        case,
        timing,
        TestOutcome::Failed,
        vec![TestResultMessage::new(MessageCategory::Error, text)],
        None,
    )
}

/// Captured streams, plus a note for each one cut down to its tail.
fn stream_messages(
    stdout: &str,
    out: &ProcessOutcome,
    cfg: &ExecutorConfig,
) -> Vec<TestResultMessage> {
    let mut messages = Vec::new();
    if !stdout.trim().is_empty() {
        messages.push(TestResultMessage::new(MessageCategory::StdOut, stdout));
    }
    if !out.stderr.trim().is_empty() {
        messages.push(TestResultMessage::new(MessageCategory::StdErr, &out.stderr));
    }
    let tails = [
        ("stdout", out.stdout_truncated),
        ("stderr", out.stderr_truncated),
    ];
    for (stream, truncated) in tails {
        if truncated {
            messages.push(TestResultMessage::new(
                MessageCategory::AdditionalInfo,
                format!("{stream} truncated to last {} bytes", cfg.capture_bytes),
            ));
        }
    }
    messages
}

fn finish(
    case: &TestCase,
    timing: Timing,
    outcome: TestOutcome,
    messages: Vec<TestResultMessage>,
    exit_code: Option<i32>,
) -> TestResult {
    TestResult {
        test_case: case.clone(),
        outcome,
        messages,
        exit_code,
        start_time: timing.start,
        end_time: Utc::now(),
        duration_ms: timing.clock.elapsed().as_millis() as u64,
    }
}
