use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Jsonl,
}

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Run tests declared in project files")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ./testexec.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Discover and run the tests of one or more project files.
    Run(RunArgs),
    /// Print the fully qualified name of every discovered test.
    List(ListArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(required = true)]
    pub projects: Vec<PathBuf>,

    /// Glob over fully qualified names (`file::name::framework`).
    /// Can be specified multiple times; a test runs when any filter matches.
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,

    /// Extra environment variables for every test process (KEY=VALUE).
    /// Can be specified multiple times.
    #[arg(long = "env", action = clap::ArgAction::Append)]
    pub env: Vec<String>,

    /// Run every test in this directory instead of its project's.
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Per-test timeout, overriding the config.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print output of passed and skipped tests too (text format).
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Plain ASCII outcome markers (text format).
    #[arg(long, default_value_t = false)]
    pub ascii: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ListArgs {
    #[arg(required = true)]
    pub projects: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_repeated_flags() {
        let args = Args::parse_from([
            "testexec",
            "run",
            "a.toml",
            "b.toml",
            "--filter",
            "*::slow::*",
            "--env",
            "CI=1",
            "--env",
            "DEBUG=x",
            "--format",
            "jsonl",
            "--timeout-ms",
            "500",
        ]);
        let Commands::Run(run) = args.command else {
            panic!("expected run");
        };
        assert_eq!(run.projects, vec![PathBuf::from("a.toml"), PathBuf::from("b.toml")]);
        assert_eq!(run.filters, vec!["*::slow::*".to_string()]);
        assert_eq!(run.env.len(), 2);
        assert_eq!(run.format, OutputFormat::Jsonl);
        assert_eq!(run.timeout_ms, Some(500));
    }

    #[test]
    fn run_requires_a_project() {
        assert!(Args::try_parse_from(["testexec", "run"]).is_err());
    }

    #[test]
    fn config_is_global() {
        let args = Args::parse_from(["testexec", "list", "p.toml", "--config", "c.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
    }
}
