//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend URL, the last used username and the
//! automatic backup interval.
//!
//! Configuration is stored at `~/.config/ledgercache/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "ledgercache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding the configured backend URL
pub const API_URL_ENV: &str = "LEDGERCACHE_API_URL";

/// Backend used when nothing is configured
const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Transactions replayed per restore batch
pub const RESTORE_BATCH_SIZE: usize = 5;

/// Pause between restore batches
pub const RESTORE_BATCH_DELAY_MS: u64 = 100;

/// Interval between automatic backups
pub const AUTO_BACKUP_INTERVAL_SECS: u64 = 60;

/// Password given to users recreated from the backup
pub const RESTORED_USER_PASSWORD: &str = "password123";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_username: Option<String>,
    pub backup_interval_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Backend URL: environment override, then config file, then default
    pub fn api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn sync_options(&self) -> SyncOptions {
        let mut options = SyncOptions::default();
        if let Some(secs) = self.backup_interval_secs.filter(|secs| *secs > 0) {
            options.backup_interval = Duration::from_secs(secs);
        }
        options
    }
}

/// Tuning knobs for backup and restore passes.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub backup_interval: Duration,
    pub restored_user_password: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: RESTORE_BATCH_SIZE,
            batch_delay: Duration::from_millis(RESTORE_BATCH_DELAY_MS),
            backup_interval: Duration::from_secs(AUTO_BACKUP_INTERVAL_SECS),
            restored_user_password: RESTORED_USER_PASSWORD.to_string(),
        }
    }
}
