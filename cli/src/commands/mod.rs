pub mod cli;
pub mod list;
pub mod run;

use std::path::Path;

use testexec_core::api::{load_default, load_path, AppConfig};
use testexec_core::config::apply_env_overrides;

use crate::error::CliError;

/// `--config` when given, else `./testexec.toml` when present, else defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    match path {
        Some(path) => {
            let mut cfg = load_path(path)?;
            apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
            Ok(cfg)
        }
        None => load_default().map_err(CliError::Setup),
    }
}
