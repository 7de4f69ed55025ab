//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the service URL, paging and debounce settings, locale, the failure
//! policy for optimistic mutations, and the last used login email.
//!
//! Configuration is stored at `~/.config/chaladshare/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::{DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::friends::{ControllerSettings, FailurePolicy};
use crate::messages::Locale;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "chaladshare";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "CHALADSHARE_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Connections shown per page
    pub page_size: u32,
    /// Incoming requests fetched in the single request page
    pub request_page_size: u32,
    pub search_debounce_ms: u64,
    pub locale: Locale,
    pub failure_policy: FailurePolicy,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            page_size: 20,
            request_page_size: 50,
            search_debounce_ms: 300,
            locale: Locale::default(),
            failure_policy: FailurePolicy::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
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

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
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

    /// Settings handed to the friends controller. Zero sizes fall back to one.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            page_size: self.page_size.max(1),
            request_page_size: self.request_page_size.max(1),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
            failure_policy: self.failure_policy,
            locale: self.locale,
        }
    }
}
