//! Result sinks.
//!
//! The executor is the only writer during a session; recorders take `&self`
//! so one instance can be shared with the thread that inspects results.

mod jsonl;
mod memory;
mod text;

pub use jsonl::JsonlRecorder;
pub use memory::MemoryRecorder;
pub use text::{TextMarkers, TextRecorder};

use crate::model::{TestCase, TestOutcome, TestResult};

pub trait TestRecorder: Send + Sync {
    /// Called right before the case's runner is launched.
    fn record_start(&self, _case: &TestCase) {}

    fn record_result(&self, result: TestResult);

    /// Called after `record_result` for the same case.
    fn record_end(&self, _case: &TestCase, _outcome: TestOutcome) {}
}

impl<R: TestRecorder + ?Sized> TestRecorder for std::sync::Arc<R> {
    fn record_start(&self, case: &TestCase) {
        (**self).record_start(case)
    }

    fn record_result(&self, result: TestResult) {
        (**self).record_result(result)
    }

    fn record_end(&self, case: &TestCase, outcome: TestOutcome) {
        (**self).record_end(case, outcome)
    }
}
