use clap::Parser;
mod commands;
mod error;
use commands::cli;
use tracing_subscriber::EnvFilter;

const EXIT_FATAL: i32 = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    let exit = match dispatch(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("testexec: {}", error_chain(&e));
            EXIT_FATAL
        }
    };
    std::process::exit(exit);
}

async fn dispatch(args: cli::Args) -> Result<i32, error::CliError> {
    let cfg = commands::load_config(args.config.as_deref())?;
    match args.command {
        cli::Commands::Run(run_args) => commands::run::handle_run(run_args, cfg).await,
        cli::Commands::List(list_args) => commands::list::handle_list(list_args, cfg).await,
    }
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        let next = s.to_string();
        if !text.ends_with(&next) {
            text.push_str(": ");
            text.push_str(&next);
        }
        source = s.source();
    }
    text
}
