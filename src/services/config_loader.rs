use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
    /// Used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_name: default_log_file_name(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ExportConfig {
    /// Where the last published standings are written when the command stream ends
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ScoreboardConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

fn default_log_directory() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_file_name() -> String {
    "scoreboard.log".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `Ok(None)` when the file does not exist, so the caller can fall back to
/// defaults once logging is up.
pub fn load_scoreboard_config(config_path: &Path) -> Result<Option<ScoreboardConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config at {}", config_path.display()))?;

    toml::from_str::<ScoreboardConfig>(&raw)
        .map(Some)
        .with_context(|| format!("Failed to parse config at {}", config_path.display()))
}
