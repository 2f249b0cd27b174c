//! User configuration
//!
//! Read from `<config dir>/restack/config.toml`. Every field has a default, and
//! problems are reported as issues instead of failing startup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::EngineConfig;

/// Levels accepted by `[log] level`
const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Branches used to find where the current branch started
    pub main_branches: Vec<String>,
    /// Add `update-ref` todos for branches on rewritten commits
    pub update_refs: bool,
    /// Maximum number of commits shown below the todos
    pub commit_limit: usize,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Log file; defaults to `restack.log` in the temp directory
    pub file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            main_branches: engine.main_branches,
            update_refs: engine.update_refs,
            commit_limit: engine.commit_limit,
            log: LogConfig::default(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

impl Config {
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            main_branches: self.main_branches.clone(),
            update_refs: self.update_refs,
            commit_limit: self.commit_limit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoadReport {
    pub config: Config,
    pub path: Option<PathBuf>,
    pub issues: Vec<String>,
}

pub fn load_config_with_report() -> ConfigLoadReport {
    let path = default_config_path();
    let mut issues = Vec::new();
    let config = match path.as_deref() {
        Some(path) => match read_config(path) {
            Ok(Some(config)) => config,
            Ok(None) => Config::default(),
            Err(err) => {
                issues.push(err);
                Config::default()
            }
        },
        None => {
            issues.push("failed to locate user config directory".to_string());
            Config::default()
        }
    };

    issues.extend(validate_config(&config));

    ConfigLoadReport {
        config,
        path,
        issues,
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir()?;
    base.push("restack");
    base.push("config.toml");
    Some(base)
}

/// Read a config file; `Ok(None)` when it does not exist
pub fn read_config(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|err| format!("failed reading {path:?}: {err}"))?;
    let config = toml::from_str::<Config>(&raw)
        .map_err(|err| format!("failed parsing {path:?} as TOML: {err}"))?;
    Ok(Some(config))
}

pub fn validate_config(config: &Config) -> Vec<String> {
    let mut issues = Vec::new();

    for name in &config.main_branches {
        if name.trim().is_empty() || name.contains(char::is_whitespace) {
            issues.push(format!("invalid main branch name '{name}'"));
        }
    }
    if config.commit_limit == 0 {
        issues.push("commit_limit must be greater than zero".to_string());
    }

    let level = config.log.level.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        issues.push(format!(
            "invalid log level '{}' (expected: {})",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }
    issues
}
