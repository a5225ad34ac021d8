use std::path::Path;

use testexec_core::api::{LaunchError, RunContext, RunnerSpec, TestCase, TestFramework};
use testexec_core::runner::effective_working_dir;

/// A runner described by config: `program` plus an argument template.
///
/// Templates may use `{file}`, `{name}`, `{fqn}` and `{workdir}`. Unknown
/// placeholders are passed through untouched.
pub struct CommandFramework {
    name: String,
    program: String,
    args: Vec<String>,
    discover_args: Option<Vec<String>>,
}

#[derive(Default)]
struct Vars<'a> {
    file: &'a str,
    name: &'a str,
    fqn: &'a str,
    workdir: &'a str,
}

impl CommandFramework {
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
        discover_args: Option<Vec<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args,
            discover_args,
        }
    }
}

impl TestFramework for CommandFramework {
    fn name(&self) -> &str {
        &self.name
    }

    fn program(&self) -> &str {
        &self.program
    }

    fn plan(&self, case: &TestCase, ctx: &RunContext) -> Result<RunnerSpec, LaunchError> {
        if self.program.trim().is_empty() {
            return Err(LaunchError::Plan(format!(
                "framework '{}' has no program",
                self.name
            )));
        }

        let cwd = effective_working_dir(case, ctx);
        let workdir = cwd.to_string_lossy();
        let vars = Vars {
            file: case.test_file(),
            name: case.test_name(),
            fqn: case.fully_qualified_name(),
            workdir: &workdir,
        };
        let args: Vec<String> = self.args.iter().map(|a| expand(a, &vars)).collect();

        tracing::debug!(
            target: "testexec.runner",
            framework = %self.name,
            fqn = %case.fully_qualified_name(),
            program = %self.program,
            args = ?args,
            "planned command test"
        );
        Ok(RunnerSpec::new(&self.program, cwd)
            .args(args)
            .with_context_env(ctx))
    }

    fn discover_spec(&self, test_file: &str, working_dir: &Path) -> Option<RunnerSpec> {
        let template = self.discover_args.as_ref()?;
        let workdir = working_dir.to_string_lossy();
        let vars = Vars {
            file: test_file,
            workdir: &workdir,
            ..Vars::default()
        };
        Some(
            RunnerSpec::new(&self.program, working_dir)
                .args(template.iter().map(|a| expand(a, &vars))),
        )
    }
}

fn expand(template: &str, vars: &Vars<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let Some(close) = tail.find('}') else {
            out.push_str(tail);
            return out;
        };
        let value = match &tail[1..close] {
            "file" => Some(vars.file),
            "name" => Some(vars.name),
            "fqn" => Some(vars.fqn),
            "workdir" => Some(vars.workdir),
            _ => None,
        };
        match value {
            Some(v) => out.push_str(v),
            None => out.push_str(&tail[..=close]),
        }
        rest = &tail[close + 1..];
    }
    out.push_str(rest);
    out
}
