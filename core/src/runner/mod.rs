mod capture;
pub mod exit;
mod framework;
pub mod marker;
mod process;
mod registry;

pub use capture::TailBuffer;
pub use framework::{effective_working_dir, RunnerSpec, TestFramework};
pub use process::{run_process, ProcessLimits, ProcessOutcome, Termination};
pub use registry::FrameworkRegistry;
