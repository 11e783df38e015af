//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! the backend base URL, the request timeout and the cache lifetimes used by
//! each resource store.
//!
//! Configuration is stored at `~/.config/waypoint/config.json`. The
//! `WAYPOINT_API_URL` environment variable overrides the stored base URL.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;

/// Application name used for config directory paths
const APP_NAME: &str = "waypoint";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "WAYPOINT_API_URL";

/// Environment variable carrying the bearer token
pub const API_TOKEN_ENV: &str = "WAYPOINT_API_TOKEN";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";

/// Default cache lifetime for every resource, in minutes
pub const DEFAULT_TTL_MINUTES: u64 = 5;

/// Largest lifetime `chrono::Duration` can represent, in minutes
const MAX_TTL_MINUTES: i64 = i64::MAX / 60_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            cache: CacheConfig::default(),
        }
    }
}

/// Cache lifetimes. Overrides are keyed by resource name (e.g. `"tours"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub default_ttl_minutes: u64,
    pub ttl_minutes: BTreeMap<String, u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
            ttl_minutes: BTreeMap::new(),
        }
    }
}

impl CacheConfig {
    /// Cache lifetime for the named resource.
    pub fn ttl_for(&self, resource: &str) -> chrono::Duration {
        let minutes = self
            .ttl_minutes
            .get(resource)
            .copied()
            .unwrap_or(self.default_ttl_minutes);
        let minutes = i64::try_from(minutes)
            .unwrap_or(MAX_TTL_MINUTES)
            .min(MAX_TTL_MINUTES);
        chrono::Duration::minutes(minutes)
    }
}

impl Config {
    /// Load from `path` (or the default location), then apply environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load_from(&Self::config_path()?)?,
        };
        config.apply_env(std::env::var(API_URL_ENV).ok());
        Ok(config)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Invalid config file {}", path.display()))
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

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn apply_env(&mut self, api_url: Option<String>) {
        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_base_url = url;
        }
    }
}
