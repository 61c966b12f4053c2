/// Application configuration management
/// Read from ~/.config/db-dump/config.toml unless --config points elsewhere

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{validate_overrides, OverrideEntry};
use crate::core::error::{BackupError, Result};
use crate::utils::{CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_OUT_DIR};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub out_dir: Option<PathBuf>,
    #[serde(default)]
    pub overrides: Vec<OverrideEntry>,
}

impl AppConfig {
    /// Default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load configuration. An explicit path must exist; a missing default
    /// file means built-in defaults and no overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::config_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = fs::read_to_string(&path).map_err(|e| {
            BackupError::Configuration(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::from_toml(&contents).map_err(|e| match e {
            BackupError::Configuration(msg) => {
                BackupError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| BackupError::Configuration(format!("failed to parse config: {}", e)))?;
        validate_overrides(&config.overrides)?;
        Ok(config)
    }

    /// Backup root: command line first, then config file, then the default
    pub fn out_dir(&self, cli_out_dir: Option<&Path>) -> PathBuf {
        cli_out_dir
            .map(Path::to_path_buf)
            .or_else(|| self.out_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUT_DIR))
    }
}
