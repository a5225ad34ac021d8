use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Builds the identifier a test case is addressed by: `<file>::<name>::<framework>`.
pub fn make_fully_qualified_name(test_file: &str, test_name: &str, framework: &str) -> String {
    format!("{test_file}::{test_name}::{framework}")
}

/// A single addressable test, immutable once discovered.
///
/// Only [`TestCase::new`] builds one, so the fully qualified name always
/// agrees with its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TestCase {
    fully_qualified_name: String,
    /// Project file the case was discovered from.
    source: PathBuf,
    /// Test file, relative to `working_dir`.
    test_file: String,
    test_name: String,
    framework: String,
    working_dir: PathBuf,
}

impl TestCase {
    pub fn new(
        source: impl Into<PathBuf>,
        test_file: impl Into<String>,
        test_name: impl Into<String>,
        framework: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        let test_file = test_file.into();
        let test_name = test_name.into();
        let framework = framework.into();
        Self {
            fully_qualified_name: make_fully_qualified_name(&test_file, &test_name, &framework),
            source: source.into(),
            test_file,
            test_name,
            framework,
            working_dir: working_dir.into(),
        }
    }

    pub fn fully_qualified_name(&self) -> &str {
        &self.fully_qualified_name
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn test_file(&self) -> &str {
        &self.test_file
    }

    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    pub fn framework(&self) -> &str {
        &self.framework
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped,
}

impl TestOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestOutcome::Passed => "passed",
            TestOutcome::Failed => "failed",
            TestOutcome::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "passed" | "pass" | "ok" => Ok(TestOutcome::Passed),
            "failed" | "fail" => Ok(TestOutcome::Failed),
            "skipped" | "skip" | "pending" => Ok(TestOutcome::Skipped),
            other => Err(format!("unknown test outcome: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageCategory {
    StdOut,
    StdErr,
    AdditionalInfo,
    Error,
}

impl MessageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageCategory::StdOut => "StdOutMsgs",
            MessageCategory::StdErr => "StdErrMsgs",
            MessageCategory::AdditionalInfo => "AdditionalInfo",
            MessageCategory::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultMessage {
    pub category: MessageCategory,
    pub text: String,
}

impl TestResultMessage {
    pub fn new(category: MessageCategory, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
        }
    }
}

/// Outcome of one completed test case. Owned by the recorder once handed over.
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub test_case: TestCase,
    pub outcome: TestOutcome,
    pub messages: Vec<TestResultMessage>,
    /// Normalized exit code of the runner process, `None` when it never exited on its own.
    pub exit_code: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
}

impl TestResult {
    pub fn messages_of(&self, category: MessageCategory) -> impl Iterator<Item = &str> {
        self.messages
            .iter()
            .filter(move |m| m.category == category)
            .map(|m| m.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_qualified_name_joins_parts() {
        let case = TestCase::new("proj.toml", "test/a.js", "adds", "export", "/work");
        assert_eq!(case.fully_qualified_name(), "test/a.js::adds::export");
        assert_eq!(case.source(), Path::new("proj.toml"));
    }

    #[test]
    fn outcome_parses_aliases() {
        assert_eq!("pending".parse::<TestOutcome>(), Ok(TestOutcome::Skipped));
        assert_eq!(" PASS ".parse::<TestOutcome>(), Ok(TestOutcome::Passed));
        assert!("flaky".parse::<TestOutcome>().is_err());
    }

    #[test]
    fn outcome_serializes_lowercase() {
        let json = serde_json::to_string(&TestOutcome::Skipped).unwrap();
        assert_eq!(json, "\"skipped\"");
    }
}
