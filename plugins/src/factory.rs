use anyhow::{bail, Result};

use testexec_core::api::{AppConfig, FrameworkConfig, FrameworkRegistry, TestExecutor};

use crate::frameworks::{CommandFramework, ExportFramework};

pub fn build_registry(cfg: &AppConfig) -> Result<FrameworkRegistry> {
    let mut registry = FrameworkRegistry::new();
    for (name, fw) in &cfg.frameworks {
        match fw {
            FrameworkConfig::Export(export) => registry.register(Box::new(ExportFramework::new(
                name,
                &export.program,
                &cfg.executor.result_marker,
            ))),
            FrameworkConfig::Command(command) => {
                if command.program.trim().is_empty() {
                    bail!("framework '{name}': `program` must not be empty");
                }
                registry.register(Box::new(CommandFramework::new(
                    name,
                    &command.program,
                    command.args.clone(),
                    command.discover_args.clone(),
                )));
            }
        }
    }
    tracing::debug!(target: "testexec.runner", frameworks = ?registry, "framework registry built");
    Ok(registry)
}

pub fn build_executor(cfg: &AppConfig) -> Result<TestExecutor> {
    Ok(TestExecutor::new(cfg.executor.clone(), build_registry(cfg)?))
}
