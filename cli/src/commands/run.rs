use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use testexec_core::api::{
    AppConfig, JsonlRecorder, RunContext, RunSummary, SessionState, TextRecorder,
};
use testexec_core::context::parse_env_pair;
use testexec_core::recorder::TextMarkers;
use testexec_plugins::factory::build_executor;

use crate::commands::cli::{OutputFormat, RunArgs};
use crate::error::CliError;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_CANCELED: i32 = 130;

pub async fn handle_run(args: RunArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let ctx = build_context(&args)?;
    let executor = Arc::new(build_executor(&cfg).map_err(CliError::Setup)?);

    let interrupt = {
        let executor = executor.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!(target: "testexec.cli", "interrupt received, canceling run");
                executor.cancel();
            }
        })
    };

    let result = match args.format {
        OutputFormat::Text => {
            let markers = if args.ascii {
                TextMarkers::ascii()
            } else {
                TextMarkers::unicode()
            };
            let rec = TextRecorder::new(std::io::stdout(), markers).verbose(args.verbose);
            executor
                .run_sources_async(&args.projects, &ctx, &rec)
                .await
        }
        OutputFormat::Jsonl => {
            let rec = JsonlRecorder::new(std::io::stdout());
            executor
                .run_sources_async(&args.projects, &ctx, &rec)
                .await
        }
    };
    interrupt.abort();

    let summary = result?;
    print_summary(&summary, args.format)?;
    Ok(exit_code(&summary))
}

fn build_context(args: &RunArgs) -> Result<RunContext, CliError> {
    let mut ctx = RunContext::new();

    if let Some(dir) = &args.workdir {
        ctx = ctx.with_working_dir(dir.clone());
    }

    for raw in &args.env {
        let (key, value) = parse_env_pair(raw).map_err(CliError::Command)?;
        ctx = ctx.with_env(key, value);
    }

    for filter in &args.filters {
        ctx = ctx
            .with_filter(filter)
            .map_err(|e| CliError::Command(format!("invalid --filter '{filter}': {e}")))?;
    }

    if let Some(ms) = args.timeout_ms {
        if ms == 0 {
            return Err(CliError::Command(
                "--timeout-ms must be greater than 0".to_string(),
            ));
        }
        ctx = ctx.with_test_timeout(Duration::from_millis(ms));
    }

    Ok(ctx)
}

fn print_summary(summary: &RunSummary, format: OutputFormat) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();
    match format {
        OutputFormat::Text => {
            writeln!(out)?;
            if summary.state == SessionState::Canceled {
                writeln!(out, "run canceled")?;
            }
            writeln!(
                out,
                "{} of {} tests: {} passed, {} failed, {} skipped ({:.1}s)",
                summary.recorded(),
                summary.total,
                summary.passed,
                summary.failed,
                summary.skipped,
                summary.duration_ms as f64 / 1000.0
            )?;
            if summary.discovery_failures > 0 {
                writeln!(
                    out,
                    "{} project file(s) could not be discovered",
                    summary.discovery_failures
                )?;
            }
        }
        OutputFormat::Jsonl => {
            let line = serde_json::json!({
                "v": 1,
                "type": "run.summary",
                "summary": summary,
            });
            writeln!(out, "{line}")?;
        }
    }
    out.flush()?;
    Ok(())
}

fn exit_code(summary: &RunSummary) -> i32 {
    if summary.state == SessionState::Canceled {
        EXIT_CANCELED
    } else if summary.failed > 0 || summary.discovery_failures > 0 {
        EXIT_FAILED
    } else {
        EXIT_OK
    }
}
