use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_RESULT_MARKER: &str = "@@TESTEXEC_RESULT@@";
pub const EXPORT_FRAMEWORK: &str = "export";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default = "default_frameworks")]
    pub frameworks: BTreeMap<String, FrameworkConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            frameworks: default_frameworks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    #[serde(default = "default_test_timeout_ms")]
    pub test_timeout_ms: u64,

    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// How long to keep reading a child's pipes after it exited or was killed.
    #[serde(default = "default_drain_grace_ms")]
    pub drain_grace_ms: u64,

    #[serde(default = "default_capture_bytes")]
    pub capture_bytes: usize,

    #[serde(default = "default_result_marker")]
    pub result_marker: String,
}

fn default_test_timeout_ms() -> u64 {
    30_000
}

fn default_discovery_timeout_ms() -> u64 {
    10_000
}

fn default_drain_grace_ms() -> u64 {
    500
}

fn default_capture_bytes() -> usize {
    65_536
}

fn default_result_marker() -> String {
    DEFAULT_RESULT_MARKER.to_string()
}

impl ExecutorConfig {
    pub fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn drain_grace(&self) -> Duration {
        Duration::from_millis(self.drain_grace_ms)
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            test_timeout_ms: default_test_timeout_ms(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            drain_grace_ms: default_drain_grace_ms(),
            capture_bytes: default_capture_bytes(),
            result_marker: default_result_marker(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FrameworkConfig {
    #[serde(rename = "export")]
    Export(ExportFrameworkConfig),
    #[serde(rename = "command")]
    Command(CommandFrameworkConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFrameworkConfig {
    #[serde(default = "default_node_program")]
    pub program: String,
}

impl Default for ExportFrameworkConfig {
    fn default() -> Self {
        Self {
            program: default_node_program(),
        }
    }
}

/// A runner described entirely by configuration.
///
/// `args` and `discover_args` may contain `{file}`, `{name}`, `{fqn}` and
/// `{workdir}` placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandFrameworkConfig {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub discover_args: Option<Vec<String>>,
}

fn default_node_program() -> String {
    "node".to_string()
}

pub(crate) fn default_frameworks() -> BTreeMap<String, FrameworkConfig> {
    let mut out = BTreeMap::new();
    out.insert(
        EXPORT_FRAMEWORK.to_string(),
        FrameworkConfig::Export(ExportFrameworkConfig::default()),
    );
    out
}
