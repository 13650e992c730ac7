//! Client Settings
//!
//! Loads `settings.json` from the user config directory and applies
//! environment overrides. Missing file means defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Directory name under the platform config dir
const APP_DIR: &str = "contextsync";

/// Settings file name
const SETTINGS_FILE: &str = "settings.json";

/// Environment variable that overrides the backend base URL
pub const ENV_API_BASE_URL: &str = "CONTEXTSYNC_API_BASE_URL";

/// Default backend location (the engine listens on localhost:8000)
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Lines of each function sent with a stats batch
pub const DEFAULT_SNIPPET_MAX_LINES: u32 = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config directory not found")]
    NoConfigDir,
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
}

impl Serialize for ConfigError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// User-facing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_base_url: String,
    pub enable_code_lens: bool,
    pub snippet_max_lines: u32,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            enable_code_lens: true,
            snippet_max_lines: DEFAULT_SNIPPET_MAX_LINES,
            request_timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

impl Settings {
    /// Load from the default location, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = settings_path()?;
        let settings = Self::load_from(&path)?;
        settings.with_env_overrides()
    }

    /// Load from an explicit file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Loaded settings");
        settings.validated()
    }

    /// Apply `CONTEXTSYNC_API_BASE_URL` if set and non-empty.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        match std::env::var(ENV_API_BASE_URL) {
            Ok(url) if !url.trim().is_empty() => self.with_api_base_url(&url),
            _ => Ok(self),
        }
    }

    /// Replace the base URL, validating it.
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = url.to_string();
        self.validated()
    }

    fn validated(mut self) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(&self.api_base_url)?;
        Ok(self)
    }
}

/// Trim whitespace and trailing slashes; require an http(s) scheme.
pub fn normalize_base_url(url: &str) -> Result<String, ConfigError> {
    let trimmed = url.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(url.to_string()));
    }
    let base = trimmed.trim_end_matches('/');
    if base.ends_with(':') || base.ends_with("//") {
        return Err(ConfigError::InvalidBaseUrl(url.to_string()));
    }
    Ok(base.to_string())
}

/// `<config_dir>/contextsync/settings.json`
pub fn settings_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join(APP_DIR).join(SETTINGS_FILE))
}
