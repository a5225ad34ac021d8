use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::model::{MessageCategory, TestOutcome, TestResult};

use super::TestRecorder;

#[derive(Debug, Clone, Copy)]
pub struct TextMarkers {
    pub ok: &'static str,
    pub fail: &'static str,
    pub skip: &'static str,
}

impl TextMarkers {
    pub fn unicode() -> Self {
        Self {
            ok: "✓",
            fail: "✗",
            skip: "○",
        }
    }

    pub fn ascii() -> Self {
        Self {
            ok: "[OK]",
            fail: "[FAIL]",
            skip: "[SKIP]",
        }
    }

    fn for_outcome(&self, outcome: TestOutcome) -> &'static str {
        match outcome {
            TestOutcome::Passed => self.ok,
            TestOutcome::Failed => self.fail,
            TestOutcome::Skipped => self.skip,
        }
    }
}

/// Human readable, one line per test; failures get their messages indented below.
pub struct TextRecorder<W: Write + Send> {
    out: Mutex<W>,
    markers: TextMarkers,
    verbose: bool,
}

impl<W: Write + Send> TextRecorder<W> {
    pub fn new(out: W, markers: TextMarkers) -> Self {
        Self {
            out: Mutex::new(out),
            markers,
            verbose: false,
        }
    }

    /// Also print messages of passed and skipped tests.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, result: &TestResult) -> String {
        let mut block = format!(
            "{} {} ({:.1}s)\n",
            self.markers.for_outcome(result.outcome),
            result.test_case.fully_qualified_name(),
            result.duration_ms as f64 / 1000.0
        );
        if result.outcome != TestOutcome::Failed && !self.verbose {
            return block;
        }
        for msg in &result.messages {
            if msg.text.trim().is_empty() {
                continue;
            }
            let label = match msg.category {
                MessageCategory::StdOut => "stdout",
                MessageCategory::StdErr => "stderr",
                MessageCategory::AdditionalInfo => "info",
                MessageCategory::Error => "error",
            };
            block.push_str(&format!("    {label}:\n"));
            for line in msg.text.lines() {
                block.push_str("      ");
                block.push_str(line);
                block.push('\n');
            }
        }
        block
    }
}

impl<W: Write + Send> TestRecorder for TextRecorder<W> {
    fn record_result(&self, result: TestResult) {
        let block = self.render(&result);
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = out.write_all(block.as_bytes()).and_then(|_| out.flush()) {
            tracing::warn!(target: "testexec.recorder", error = %e, "failed to write result");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::{TestCase, TestResultMessage};

    fn result(outcome: TestOutcome) -> TestResult {
        TestResult {
            test_case: TestCase::new("p.toml", "a.js", "works", "export", "."),
            outcome,
            messages: vec![TestResultMessage::new(
                MessageCategory::StdErr,
                "AssertionError\n  at a.js:3",
            )],
            exit_code: Some(1),
            start_time: Utc::now(),
            end_time: Utc::now(),
            duration_ms: 1500,
        }
    }

    #[test]
    fn failures_include_messages() {
        let rec = TextRecorder::new(Vec::new(), TextMarkers::ascii());
        rec.record_result(result(TestOutcome::Failed));
        let text = String::from_utf8(rec.into_inner()).unwrap();
        assert_eq!(
            text,
            "[FAIL] a.js::works::export (1.5s)\n    stderr:\n      AssertionError\n        at a.js:3\n"
        );
    }

    #[test]
    fn passes_are_one_line() {
        let rec = TextRecorder::new(Vec::new(), TextMarkers::ascii());
        rec.record_result(result(TestOutcome::Passed));
        let text = String::from_utf8(rec.into_inner()).unwrap();
        assert_eq!(text, "[OK] a.js::works::export (1.5s)\n");
    }
}
