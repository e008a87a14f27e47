//! Client configuration.
//!
//! Configuration is stored at `~/.config/wayfarer/config.json`. Every field
//! has a default, so a missing file is equivalent to `{}`. Environment
//! variables (`WAYFARER_*`) override whatever the file says.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::FileStorage;

/// Application name used for config directory paths
const APP_NAME: &str = "wayfarer";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend origin used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:9082";

/// Per-request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Where the UI sends users whose session expired.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

pub const ENV_BASE_URL: &str = "WAYFARER_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "WAYFARER_TIMEOUT_MS";
pub const ENV_CSRF_TOKEN: &str = "WAYFARER_CSRF_TOKEN";
pub const ENV_SESSION_DIR: &str = "WAYFARER_SESSION_DIR";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub login_path: String,
    /// Anti-forgery token sent as `X-CSRF-Token`.
    pub csrf_token: Option<String>,
    pub session_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: crate::api::MAX_RETRIES,
            retry_backoff_ms: 0,
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            csrf_token: None,
            session_dir: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Override fields from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(base_url) = lookup(ENV_BASE_URL) {
            self.base_url = base_url;
        }
        if let Some(timeout) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS))?;
        }
        if let Some(token) = lookup(ENV_CSRF_TOKEN) {
            self.csrf_token = Some(token).filter(|t| !t.is_empty());
        }
        if let Some(dir) = lookup(ENV_SESSION_DIR) {
            self.session_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Base URL without a trailing slash, ready for path concatenation.
    pub fn origin(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Location of the durable session record.
    pub fn session_path(&self) -> Result<PathBuf> {
        match self.session_dir {
            Some(ref dir) => Ok(FileStorage::path_in(dir)),
            None => FileStorage::default_path(),
        }
    }
}
