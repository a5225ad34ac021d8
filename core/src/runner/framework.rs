use std::path::{Path, PathBuf};

use crate::context::RunContext;
use crate::error::LaunchError;
use crate::model::TestCase;

/// A fully resolved command line for one child process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunnerSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl RunnerSpec {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
            env: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Copies the run context's environment into the spec.
    pub fn with_context_env(mut self, ctx: &RunContext) -> Self {
        self.env
            .extend(ctx.env().iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }
}

/// How a test case becomes a runner process.
pub trait TestFramework: Send + Sync {
    fn name(&self) -> &str;

    /// Binary that must be resolvable before a session using this framework starts.
    fn program(&self) -> &str;

    fn plan(&self, case: &TestCase, ctx: &RunContext) -> Result<RunnerSpec, LaunchError>;

    /// Command that lists the test names of `test_file`, one per stdout line.
    fn discover_spec(&self, _test_file: &str, _working_dir: &Path) -> Option<RunnerSpec> {
        None
    }
}

/// Working directory a case runs in: the context override, else the case's own.
pub fn effective_working_dir(case: &TestCase, ctx: &RunContext) -> PathBuf {
    ctx.working_dir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| case.working_dir().to_path_buf())
}
