//! Configuration loading and validation.
//!
//! Courier reads a single human-owned `config.toml`. Everything has a
//! default except the database path, so a minimal deployment is one line.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,

    /// Dispatch-facing limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Database settings.
#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Limits applied to dispatch-facing operations.
#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    /// Maximum contacts returned by a single search.
    #[serde(default = "default_search_limit")]
    pub contact_search_limit: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            contact_search_limit: default_search_limit(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Default, Deserialize)]
pub struct LoggingConfig {
    /// Directory for rotated JSON log files. Console-only when unset.
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,
}

// Default value functions for serde

fn default_search_limit() -> usize {
    50
}

/// Load the config from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config at {}: {e}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse config at {}: {e}", path.display()))?;
    Ok(config)
}

/// Resolve the default config directory (`~/.courier/`).
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_dir() -> anyhow::Result<PathBuf> {
    let home = directories::BaseDirs::new()
        .ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.home_dir().join(".courier"))
}
