//! Application configuration management.
//!
//! Configuration is stored at `~/.config/pocketcache/config.json`. Every
//! field is optional; missing values fall back to platform directories and
//! built-in defaults. `POCKETCACHE_DATA_DIR` and `POCKETCACHE_CACHE_DIR`
//! override the stored directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::{client::REQUEST_TIMEOUT_SECS, HttpClient};
use crate::backup::BackupManager;
use crate::cache::{CacheNamespace, FileStore, KeyValueStore};
use crate::expenses::{ExpenseStore, ExpenseTracker};
use crate::fetch::CachedFetcher;

/// Application name used for config/cache/data directory paths
pub const APP_NAME: &str = "pocketcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Cache namespace owned by the fetch layer
pub const FETCH_NAMESPACE: &str = "fetch";

pub const DATA_DIR_ENV: &str = "POCKETCACHE_DATA_DIR";
pub const CACHE_DIR_ENV: &str = "POCKETCACHE_CACHE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_min_latency_ms: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Apply the process environment on top of the stored values.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = lookup(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.cache_dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Directory holding the expense database and backup file
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(REQUEST_TIMEOUT_SECS))
    }

    pub fn default_min_latency(&self) -> Option<Duration> {
        self.default_min_latency_ms.map(Duration::from_millis)
    }

    /// Shared on-disk cache store
    pub fn cache_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        Ok(Arc::new(FileStore::new(self.cache_dir()?)?))
    }

    /// Fetcher backed by the on-disk cache under the fetch namespace
    pub fn fetcher(&self) -> Result<CachedFetcher> {
        let http = HttpClient::with_timeout(self.request_timeout())?;
        let cache = CacheNamespace::new(self.cache_store()?, FETCH_NAMESPACE);
        Ok(CachedFetcher::new(http, cache))
    }

    /// Tracker over the data directory. The store still needs `init`.
    pub fn expense_tracker(&self) -> Result<ExpenseTracker> {
        let data_dir = self.data_dir()?;
        Ok(ExpenseTracker::new(
            ExpenseStore::in_dir(&data_dir),
            BackupManager::in_dir(&data_dir),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(REQUEST_TIMEOUT_SECS));
        assert_eq!(config.default_min_latency(), None);
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");
        let config = Config {
            data_dir: Some(temp_dir.path().join("data")),
            request_timeout_secs: Some(5),
            default_min_latency_ms: Some(1000),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.data_dir().unwrap(), temp_dir.path().join("data"));
        assert_eq!(loaded.default_min_latency(), Some(Duration::from_millis(1000)));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default().with_overrides(|name| match name {
            DATA_DIR_ENV => Some("/tmp/pc-data".to_string()),
            CACHE_DIR_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/pc-data")));
        assert_eq!(config.cache_dir, None);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
