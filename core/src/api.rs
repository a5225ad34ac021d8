//! Stable re-exports for consumers (`cli`, `plugins`, and external hosts).
//!
//! Prefer importing from `testexec_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_path, AppConfig, CommandFrameworkConfig, ExecutorConfig,
    ExportFrameworkConfig, FrameworkConfig,
};
pub use crate::context::RunContext;
pub use crate::discovery::{discover_project, load_manifest, ProjectManifest, TestEntry};
pub use crate::error::{ConfigError, DiscoveryError, ExecutorError, LaunchError};
pub use crate::executor::{RunSummary, SessionState, TestExecutor};
pub use crate::model::{
    make_fully_qualified_name, MessageCategory, TestCase, TestOutcome, TestResult,
    TestResultMessage,
};
pub use crate::recorder::{JsonlRecorder, MemoryRecorder, TestRecorder, TextRecorder};
pub use crate::runner::{
    FrameworkRegistry, ProcessLimits, ProcessOutcome, RunnerSpec, Termination, TestFramework,
};
