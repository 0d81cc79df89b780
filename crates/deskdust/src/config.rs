//! Configuration persistence for the overlay host
//!
//! One `config.json` next to the user config directory (or an explicit
//! path). A missing file is written out with defaults on first run so
//! users have something to edit; a malformed file falls back to defaults
//! rather than refusing to start.

use std::fs;
use std::path::{Path, PathBuf};

use deskdust_core::config::AppConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigStoreError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads, holds and writes back the persisted [`AppConfig`].
pub struct ConfigStore {
    path: PathBuf,
    pub config: AppConfig,
}

impl ConfigStore {
    /// The per-user default location, `<config dir>/deskdust/config.json`.
    /// Falls back to the working directory when no config dir exists.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join("deskdust"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.json")
    }

    /// Open the store at `path`, writing a defaults file if none exists.
    /// A file that fails to parse is logged and left untouched; the run
    /// continues with defaults.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigStoreError> {
        let path = path.into();
        let config = match Self::read(&path) {
            Ok(Some(config)) => config,
            Ok(None) => {
                let config = AppConfig::default();
                Self::write(&path, &config)?;
                log::info!("wrote default config to {}", path.display());
                config
            }
            Err(err) => {
                log::warn!("ignoring unreadable config {}: {err}", path.display());
                AppConfig::default()
            }
        };
        Ok(Self { path, config })
    }

    fn read(path: &Path) -> Result<Option<AppConfig>, ConfigStoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    fn write(path: &Path, config: &AppConfig) -> Result<(), ConfigStoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(config)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Flush live edits (wheel-adjusted brush sizes and the like) to disk.
    pub fn save(&self) -> Result<(), ConfigStoreError> {
        Self::write(&self.path, &self.config)
    }
}
