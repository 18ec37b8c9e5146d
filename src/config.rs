use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::runner::DEFAULT_TIMEOUT;

pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub checks: ChecksConfig,
    pub tools: ToolsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChecksConfig {
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub rpcinfo: String,
    pub showmount: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// If not set, falls back to RUST_LOG, then "warn".
    #[serde(default)]
    pub level: Option<String>,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            rpcinfo: "rpcinfo".to_string(),
            showmount: "showmount".to_string(),
        }
    }
}

impl ChecksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LoggingConfig {
    pub fn effective_level(&self) -> String {
        match self.level.as_deref() {
            Some(level) => level.to_string(),
            None => std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", "nfs-check")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// Loads `explicit` if given (it must exist), otherwise the default config
/// file if present, otherwise built-in defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config not found at {}", path.display());
            }
            load_config(path)
        }
        None => {
            // No resolvable home directory is not an error for a health check.
            let Ok(path) = default_config_path() else {
                return Ok(Config::default());
            };
            if path.exists() {
                load_config(&path)
            } else {
                Ok(Config::default())
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config at {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let config: Config = toml::from_str(contents).context("failed to parse config TOML")?;

    if config.checks.timeout_secs == 0 {
        bail!("checks.timeout_secs must be greater than 0");
    }
    if config.tools.rpcinfo.is_empty() || config.tools.showmount.is_empty() {
        bail!("tool paths in [tools] must not be empty");
    }

    Ok(config)
}
