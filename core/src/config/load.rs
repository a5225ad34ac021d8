use std::path::Path;

use crate::error::ConfigError;

use super::types::{default_frameworks, AppConfig, FrameworkConfig};

pub const CONFIG_FILE: &str = "testexec.toml";

pub fn load_default() -> anyhow::Result<AppConfig> {
    let mut cfg = if Path::new(CONFIG_FILE).exists() {
        load_path(Path::new(CONFIG_FILE))?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg, |k| std::env::var(k).ok())?;
    Ok(cfg)
}

/// Reads a config file. Built-in frameworks the file does not mention are kept.
pub fn load_path(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.display().to_string()));
    }
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let mut cfg: AppConfig = toml::from_str(&s).map_err(ConfigError::Parse)?;
    for (name, fw) in default_frameworks() {
        cfg.frameworks.entry(name).or_insert(fw);
    }
    Ok(cfg)
}

pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("TESTEXEC_NODE_PATH") {
        if !v.trim().is_empty() {
            for fw in cfg.frameworks.values_mut() {
                if let FrameworkConfig::Export(export) = fw {
                    export.program = v.trim().to_string();
                }
            }
        }
    }

    if let Some(v) = lookup("TESTEXEC_TEST_TIMEOUT_MS") {
        if !v.trim().is_empty() {
            cfg.executor.test_timeout_ms =
                v.trim().parse().map_err(|_| ConfigError::EnvInvalid {
                    key: "TESTEXEC_TEST_TIMEOUT_MS".to_string(),
                    value: v.clone(),
                })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::EXPORT_FRAMEWORK;

    #[test]
    fn file_frameworks_merge_with_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("testexec.toml");
        std::fs::write(
            &path,
            r#"
[executor]
test_timeout_ms = 1500

[frameworks.sh]
kind = "command"
program = "sh"
args = ["{file}", "{name}"]
"#,
        )
        .unwrap();

        let cfg = load_path(&path).unwrap();
        assert_eq!(cfg.executor.test_timeout_ms, 1500);
        assert_eq!(cfg.executor.capture_bytes, 65_536);
        assert!(cfg.frameworks.contains_key(EXPORT_FRAMEWORK));
        match cfg.frameworks.get("sh") {
            Some(FrameworkConfig::Command(c)) => {
                assert_eq!(c.program, "sh");
                assert_eq!(c.args, vec!["{file}".to_string(), "{name}".to_string()]);
                assert!(c.discover_args.is_none());
            }
            other => panic!("unexpected framework config: {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_path(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("TESTEXEC_NODE_PATH", "/opt/node/bin/node"),
            ("TESTEXEC_TEST_TIMEOUT_MS", "2500"),
        ]
        .into_iter()
        .collect();
        let mut cfg = AppConfig::default();
        apply_env_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.executor.test_timeout_ms, 2500);
        match cfg.frameworks.get(EXPORT_FRAMEWORK) {
            Some(FrameworkConfig::Export(e)) => assert_eq!(e.program, "/opt/node/bin/node"),
            other => panic!("unexpected framework config: {other:?}"),
        }
    }

    #[test]
    fn invalid_timeout_env_is_rejected() {
        let mut cfg = AppConfig::default();
        let err = apply_env_overrides(&mut cfg, |k| {
            (k == "TESTEXEC_TEST_TIMEOUT_MS").then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvInvalid { .. }));
    }
}
