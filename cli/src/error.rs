use testexec_core::api::{ConfigError, ExecutorError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error("{0:#}")]
    Setup(anyhow::Error),

    #[error("{0}")]
    Command(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
