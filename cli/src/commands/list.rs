use testexec_core::api::AppConfig;
use testexec_plugins::factory::build_executor;

use crate::commands::cli::ListArgs;
use crate::error::CliError;

pub async fn handle_list(args: ListArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let executor = build_executor(&cfg).map_err(CliError::Setup)?;

    let mut failed = false;
    for project in &args.projects {
        match executor.discover(project).await {
            Ok(cases) => {
                for case in cases {
                    println!("{}", case.fully_qualified_name());
                }
            }
            Err(e) => {
                tracing::error!(
                    target: "testexec.cli",
                    project = %project.display(),
                    error = %e,
                    "discovery failed"
                );
                eprintln!("{}: {e}", project.display());
                failed = true;
            }
        }
    }
    Ok(if failed { 2 } else { 0 })
}
