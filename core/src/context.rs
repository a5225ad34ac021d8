use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glob::Pattern;

use crate::model::TestCase;

/// Run-scoped settings. The executor only ever reads it.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    working_dir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    filters: Vec<Pattern>,
    test_timeout: Option<Duration>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the working directory of every launched test process.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Adds a glob pattern matched against fully-qualified names.
    pub fn with_filter(mut self, pattern: &str) -> Result<Self, glob::PatternError> {
        self.filters.push(Pattern::new(pattern)?);
        Ok(self)
    }

    pub fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = Some(timeout);
        self
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn test_timeout(&self) -> Option<Duration> {
        self.test_timeout
    }

    /// A case runs when no filter is set or any filter matches its name.
    pub fn matches(&self, case: &TestCase) -> bool {
        self.filters.is_empty()
            || self
                .filters
                .iter()
                .any(|p| p.matches(case.fully_qualified_name()))
    }
}

/// Parses a `KEY=VALUE` pair. Empty keys are rejected, empty values are not.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    let Some((k, v)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    let k = k.trim();
    if k.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((k.to_string(), v.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(file: &str, name: &str) -> TestCase {
        TestCase::new("p.toml", file, name, "export", ".")
    }

    #[test]
    fn no_filter_matches_everything() {
        let ctx = RunContext::new();
        assert!(ctx.matches(&case("a.js", "x")));
    }

    #[test]
    fn any_filter_may_match() {
        let ctx = RunContext::new()
            .with_filter("a.js::*")
            .unwrap()
            .with_filter("*::slow*")
            .unwrap();
        assert!(ctx.matches(&case("a.js", "fast")));
        assert!(ctx.matches(&case("b.js", "slow_one")));
        assert!(!ctx.matches(&case("b.js", "fast")));
    }

    #[test]
    fn env_pair_parsing() {
        assert_eq!(
            parse_env_pair("NODE_ENV=test"),
            Ok(("NODE_ENV".to_string(), "test".to_string()))
        );
        assert_eq!(
            parse_env_pair("EMPTY="),
            Ok(("EMPTY".to_string(), String::new()))
        );
        assert!(parse_env_pair("novalue").is_err());
        assert!(parse_env_pair("=x").is_err());
    }
}
