use std::path::Path;

use testexec_core::api::{LaunchError, RunContext, RunnerSpec, TestCase, TestFramework};
use testexec_core::runner::effective_working_dir;

/// Env var carrying the result marker, so a test can report its own outcome.
pub const MARKER_ENV: &str = "TESTEXEC_RESULT_MARKER";

// argv after `-e <script>` is `<file> <name>`. A missing export, a throw, a
// rejection or a promise that never settles all exit non-zero.
const RUN_BOOTSTRAP: &str = r#"
const path = require('path');
const [file, name] = process.argv.slice(1);
const mod = require(path.resolve(process.cwd(), file));
const fn = mod && mod[name];
if (typeof fn !== 'function') {
  console.error(`test '${name}' is not exported by ${file}`);
  process.exit(1);
}
let settled = false;
process.on('beforeExit', () => {
  if (!settled) {
    console.error(`test '${name}' never settled`);
    process.exit(1);
  }
});
Promise.resolve()
  .then(() => fn())
  .then(
    () => {
      settled = true;
      process.exit(0);
    },
    (err) => {
      settled = true;
      console.error(err && err.stack ? err.stack : String(err));
      process.exit(1);
    },
  );
"#;

const DISCOVER_BOOTSTRAP: &str = r#"
const path = require('path');
const [file] = process.argv.slice(1);
const mod = require(path.resolve(process.cwd(), file));
for (const key of Object.keys(mod || {})) {
  if (typeof mod[key] === 'function') console.log(key);
}
"#;

/// Each exported function of a node module is a test; a throw or rejection fails it.
///
/// A test may report its own outcome by printing the marker found in
/// `TESTEXEC_RESULT_MARKER` followed by a JSON report.
pub struct ExportFramework {
    name: String,
    program: String,
    marker: String,
}

impl ExportFramework {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            marker: marker.into(),
        }
    }
}

impl TestFramework for ExportFramework {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn plan(&self, case: &TestCase, ctx: &RunContext) -> Result<RunnerSpec, LaunchError> {
        if case.test_file().trim().is_empty() {
            return Err(LaunchError::Plan(format!(
                "{}: empty test file",
                case.fully_qualified_name()
            )));
        }

        let mut spec = RunnerSpec::new(&self.program, effective_working_dir(case, ctx))
            .arg("-e")
            .arg(RUN_BOOTSTRAP)
            .arg(case.test_file())
            .arg(case.test_name())
            .with_context_env(ctx);
        spec.env.push((MARKER_ENV.to_string(), self.marker.clone()));

        tracing::debug!(
            target: "testexec.runner",
            framework = %self.name,
            fqn = %case.fully_qualified_name(),
            cwd = %spec.cwd.display(),
            "planned export test"
        );
        Ok(spec)
    }

    fn discover_spec(&self, test_file: &str, working_dir: &Path) -> Option<RunnerSpec> {
        Some(
            RunnerSpec::new(&self.program, working_dir)
                .arg("-e")
                .arg(DISCOVER_BOOTSTRAP)
                .arg(test_file),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn framework() -> ExportFramework {
        ExportFramework::new("export", "node", "@@M@@")
    }

    #[test]
    fn plan_passes_file_and_name_after_bootstrap() {
        let case = TestCase::new("p.toml", "test/a.js", "adds", "export", "/proj");
        let ctx = RunContext::new().with_env("CI", "1");
        let spec = framework().plan(&case, &ctx).unwrap();

        assert_eq!(spec.program, "node");
        assert_eq!(spec.cwd, PathBuf::from("/proj"));
        assert_eq!(spec.args.len(), 4);
        assert_eq!(spec.args[0], "-e");
        assert_eq!(&spec.args[2..], &["test/a.js".to_string(), "adds".to_string()]);
        assert_eq!(
            spec.env,
            vec![
                ("CI".to_string(), "1".to_string()),
                (MARKER_ENV.to_string(), "@@M@@".to_string()),
            ]
        );
    }

    #[test]
    fn context_working_dir_wins() {
        let case = TestCase::new("p.toml", "a.js", "t", "export", "/proj");
        let ctx = RunContext::new().with_working_dir("/elsewhere");
        let spec = framework().plan(&case, &ctx).unwrap();
        assert_eq!(spec.cwd, PathBuf::from("/elsewhere"));
    }

    #[test]
    fn empty_file_is_a_plan_error() {
        let case = TestCase::new("p.toml", " ", "t", "export", ".");
        assert!(matches!(
            framework().plan(&case, &RunContext::new()),
            Err(LaunchError::Plan(_))
        ));
    }

    #[test]
    fn discovery_lists_exports() {
        let spec = framework()
            .discover_spec("test/a.js", Path::new("/proj"))
            .unwrap();
        assert_eq!(spec.args[0], "-e");
        assert_eq!(spec.args[2], "test/a.js");
        assert_eq!(spec.cwd, PathBuf::from("/proj"));
    }

    #[cfg(unix)]
    mod under_node {
        use testexec_core::api::{
            ExecutorConfig, FrameworkRegistry, MemoryRecorder, MessageCategory, RunContext,
            TestExecutor, TestOutcome, TestResult,
        };

        use pretty_assertions::assert_eq;

        use super::*;

        const SUITE: &str = r#"
exports.passes = () => {};
exports.throws = () => { throw new Error('sync boom'); };
exports.rejects = async () => { throw new Error('async boom'); };
exports.hangs = () => new Promise(() => {});
exports.waits = () => new Promise((resolve) => setTimeout(resolve, 20));
exports.skips = () => {
  console.log(process.env.TESTEXEC_RESULT_MARKER + JSON.stringify({ outcome: 'skipped', message: 'not on this platform' }));
};
exports.answer = 42;
"#;

        fn node_missing() -> bool {
            if which::which("node").is_err() {
                eprintln!("node not found on PATH, skipping");
                return true;
            }
            false
        }

        fn executor() -> TestExecutor {
            let config = ExecutorConfig::default();
            let export = ExportFramework::new("export", "node", config.result_marker.clone());
            TestExecutor::new(config, FrameworkRegistry::new().with(Box::new(export)))
        }

        fn stderr(result: &TestResult) -> String {
            result.messages_of(MessageCategory::StdErr).collect()
        }

        #[test]
        fn outcomes_follow_the_exported_function() {
            if node_missing() {
                return;
            }
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("suite.js"), SUITE).unwrap();
            let names = ["passes", "throws", "rejects", "hangs", "waits", "skips", "typo"];
            let cases: Vec<TestCase> = names
                .iter()
                .map(|n| TestCase::new("suite.toml", "suite.js", *n, "export", dir.path()))
                .collect();
            // long enough that a hang is caught by the bootstrap, not the timeout
            let ctx = RunContext::new().with_test_timeout(std::time::Duration::from_secs(20));

            let rec = MemoryRecorder::new();
            let summary = executor().run_tests(&cases, &ctx, &rec).unwrap();
            assert_eq!(
                (summary.passed, summary.failed, summary.skipped),
                (2, 4, 1)
            );

            let find = |name: &str| rec.find(&format!("suite.js::{name}::export")).unwrap();
            assert_eq!(find("passes").outcome, TestOutcome::Passed);
            assert_eq!(find("waits").outcome, TestOutcome::Passed);

            let throws = find("throws");
            assert_eq!(throws.outcome, TestOutcome::Failed);
            assert!(stderr(&throws).contains("sync boom"));

            let rejects = find("rejects");
            assert_eq!(rejects.outcome, TestOutcome::Failed);
            assert!(stderr(&rejects).contains("async boom"));

            let hangs = find("hangs");
            assert_eq!(hangs.outcome, TestOutcome::Failed);
            assert_eq!(hangs.exit_code, Some(1));
            assert!(stderr(&hangs).contains("never settled"));

            let typo = find("typo");
            assert_eq!(typo.outcome, TestOutcome::Failed);
            assert!(stderr(&typo).contains("'typo' is not exported by suite.js"));

            let skips = find("skips");
            assert_eq!(skips.outcome, TestOutcome::Skipped);
            assert_eq!(
                skips
                    .messages_of(MessageCategory::AdditionalInfo)
                    .collect::<Vec<_>>(),
                vec!["not on this platform"]
            );
        }

        #[test]
        fn discovery_lists_exported_functions() {
            if node_missing() {
                return;
            }
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("suite.js"), SUITE).unwrap();
            let project = dir.path().join("suite.toml");
            std::fs::write(&project, "[[test]]\nfile = \"suite.js\"\n").unwrap();

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let cases = rt.block_on(executor().discover(&project)).unwrap();
            let names: Vec<&str> = cases.iter().map(|c| c.test_name()).collect();
            assert_eq!(
                names,
                vec!["passes", "throws", "rejects", "hangs", "waits", "skips"]
            );
        }
    }
}
