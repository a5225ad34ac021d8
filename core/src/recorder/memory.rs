use std::sync::{Mutex, PoisonError};

use crate::model::{TestCase, TestOutcome, TestResult};

use super::TestRecorder;

/// Collects everything in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    started: Mutex<Vec<TestCase>>,
    results: Mutex<Vec<TestResult>>,
    ended: Mutex<Vec<(String, TestOutcome)>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> Vec<TestResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn result_count(&self) -> usize {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn started(&self) -> Vec<TestCase> {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// `(fully_qualified_name, outcome)` pairs in `record_end` order.
    pub fn ended(&self) -> Vec<(String, TestOutcome)> {
        self.ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn find(&self, fully_qualified_name: &str) -> Option<TestResult> {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|r| r.test_case.fully_qualified_name() == fully_qualified_name)
            .cloned()
    }
}

impl TestRecorder for MemoryRecorder {
    fn record_start(&self, case: &TestCase) {
        self.started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(case.clone());
    }

    fn record_result(&self, result: TestResult) {
        self.results
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(result);
    }

    fn record_end(&self, case: &TestCase, outcome: TestOutcome) {
        self.ended
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((case.fully_qualified_name().to_string(), outcome));
    }
}
