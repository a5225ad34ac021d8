//! Project manifests and test-case discovery.
//!
//! A project file is a TOML document listing test files. Each entry either
//! names its tests or leaves discovery to its framework's discovery command.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::sync::watch;

use crate::config::EXPORT_FRAMEWORK;
use crate::error::DiscoveryError;
use crate::model::TestCase;
use crate::runner::{run_process, FrameworkRegistry, ProcessLimits, TestFramework, Termination};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_framework")]
    pub framework: String,

    /// Relative to the manifest's directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,

    #[serde(default, rename = "test")]
    pub tests: Vec<TestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestEntry {
    pub file: String,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub framework: Option<String>,
}

fn default_framework() -> String {
    EXPORT_FRAMEWORK.to_string()
}

impl ProjectManifest {
    pub fn display_name(&self, path: &Path) -> String {
        self.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string())
        })
    }

    pub fn resolve_working_dir(&self, path: &Path) -> PathBuf {
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        match &self.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base.join(dir),
            None => base.to_path_buf(),
        }
    }
}

pub fn load_manifest(path: &Path) -> Result<ProjectManifest, DiscoveryError> {
    let text = std::fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let manifest: ProjectManifest = toml::from_str(&text).map_err(|e| DiscoveryError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    for entry in &manifest.tests {
        if entry.file.trim().is_empty() {
            return Err(DiscoveryError::Parse {
                path: path.display().to_string(),
                message: "test entry with empty `file`".to_string(),
            });
        }
        if entry.names.iter().any(|n| n.trim().is_empty()) {
            return Err(DiscoveryError::Parse {
                path: path.display().to_string(),
                message: format!("empty test name in entry for {}", entry.file),
            });
        }
    }
    Ok(manifest)
}

/// Lists the cases of one project file, in declaration order.
pub async fn discover_project(
    path: &Path,
    frameworks: &FrameworkRegistry,
    limits: ProcessLimits,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Vec<TestCase>, DiscoveryError> {
    let manifest = load_manifest(path)?;
    let working_dir = manifest.resolve_working_dir(path);
    let mut cases = Vec::new();

    for entry in &manifest.tests {
        let framework_name = entry.framework.as_deref().unwrap_or(&manifest.framework);
        let framework =
            frameworks
                .get(framework_name)
                .ok_or_else(|| DiscoveryError::UnknownFramework {
                    path: path.display().to_string(),
                    framework: framework_name.to_string(),
                })?;

        let names = if entry.names.is_empty() {
            discover_names(framework, &entry.file, &working_dir, limits, cancel).await?
        } else {
            entry.names.clone()
        };

        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.clone()) {
                continue;
            }
            cases.push(TestCase::new(
                path,
                &entry.file,
                name,
                framework_name,
                &working_dir,
            ));
        }
    }

    tracing::info!(
        target: "testexec.discovery",
        project = %manifest.display_name(path),
        path = %path.display(),
        cases = cases.len(),
        "project discovered"
    );
    Ok(cases)
}

async fn discover_names(
    framework: &dyn TestFramework,
    file: &str,
    working_dir: &Path,
    limits: ProcessLimits,
    cancel: &mut watch::Receiver<bool>,
) -> Result<Vec<String>, DiscoveryError> {
    let spec = framework
        .discover_spec(file, working_dir)
        .ok_or_else(|| DiscoveryError::NoDiscovery {
            file: file.to_string(),
            framework: framework.name().to_string(),
        })?;

    let out = run_process(&spec, limits, cancel)
        .await
        .map_err(|e| DiscoveryError::Command {
            file: file.to_string(),
            reason: e.to_string(),
        })?;

    match out.termination {
        Termination::Exited(0) => Ok(out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()),
        Termination::Exited(code) => Err(DiscoveryError::Command {
            file: file.to_string(),
            reason: format!("exit code {code}: {}", out.stderr.trim()),
        }),
        Termination::TimedOut => Err(DiscoveryError::Command {
            file: file.to_string(),
            reason: format!("timed out after {}ms", limits.timeout.as_millis()),
        }),
        Termination::Canceled => Err(DiscoveryError::Canceled),
    }
}
