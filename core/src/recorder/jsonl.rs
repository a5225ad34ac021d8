use std::io::Write;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;

use crate::model::{TestCase, TestOutcome, TestResult, TestResultMessage};

use super::TestRecorder;

/// One line of the JSONL event stream.
#[derive(Debug, Serialize)]
pub struct JsonlEvent<'a> {
    pub v: u8,
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub ts: String,
    pub fqn: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<TestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "no_messages")]
    pub messages: &'a [TestResultMessage],
}

fn no_messages(m: &&[TestResultMessage]) -> bool {
    m.is_empty()
}

impl<'a> JsonlEvent<'a> {
    fn new(event_type: &'static str, case: &'a TestCase) -> Self {
        Self {
            v: 1,
            event_type,
            ts: Utc::now().to_rfc3339(),
            fqn: case.fully_qualified_name(),
            source: None,
            outcome: None,
            code: None,
            duration_ms: None,
            messages: &[],
        }
    }
}

/// Writes `test.start` / `test.result` / `test.end` events, one JSON object per line.
pub struct JsonlRecorder<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonlRecorder<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &JsonlEvent<'_>) {
        let line = match serde_json::to_string(event) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "testexec.recorder", error = %e, "failed to encode event");
                return;
            }
        };
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            tracing::warn!(target: "testexec.recorder", error = %e, "failed to write event");
        }
    }
}

impl<W: Write + Send> TestRecorder for JsonlRecorder<W> {
    fn record_start(&self, case: &TestCase) {
        let mut ev = JsonlEvent::new("test.start", case);
        ev.source = Some(case.source().display().to_string());
        self.emit(&ev);
    }

    fn record_result(&self, result: TestResult) {
        let mut ev = JsonlEvent::new("test.result", &result.test_case);
        ev.outcome = Some(result.outcome);
        ev.code = result.exit_code;
        ev.duration_ms = Some(result.duration_ms);
        ev.messages = &result.messages;
        self.emit(&ev);
    }

    fn record_end(&self, case: &TestCase, outcome: TestOutcome) {
        let mut ev = JsonlEvent::new("test.end", case);
        ev.outcome = Some(outcome);
        self.emit(&ev);
    }
}
