use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(String),

    #[error("failed to read config file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error")]
    Parse(#[source] toml::de::Error),

    #[error("env var invalid: {key}={value}")]
    EnvInvalid { key: String, value: String },
}

/// Failure to turn a test case into a running process.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("unknown test framework: {0}")]
    UnknownFramework(String),

    #[error("failed to spawn process: {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("io error while streaming: {stream}")]
    StreamIo {
        stream: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid runner plan: {0}")]
    Plan(String),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read project file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid project file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("unknown test framework '{framework}' in {path}")]
    UnknownFramework { path: String, framework: String },

    #[error("no test names for {file} and framework '{framework}' cannot discover them")]
    NoDiscovery { file: String, framework: String },

    #[error("discovery command failed for {file}: {reason}")]
    Command { file: String, reason: String },

    #[error("discovery canceled")]
    Canceled,
}

/// Errors that abort a whole session instead of being recorded as a test result.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("test runner '{program}' for framework '{framework}' not found")]
    RunnerNotFound {
        framework: String,
        program: String,
        #[source]
        source: which::Error,
    },

    #[error("executor is already running a session")]
    Busy,

    #[error("failed to start async runtime")]
    Runtime(#[source] std::io::Error),
}
