use crate::global;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub nylas: NylasConfig,
    pub poller: PollerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NylasConfig {
    pub api_uri: String,
    pub api_key: String,
    pub grant_id: String,
    /// Display name the bot joins meetings with.
    pub bot_name: String,
    pub calendar_id: String,
}

impl Default for NylasConfig {
    fn default() -> Self {
        Self {
            api_uri: "https://api.us.nylas.com".to_string(),
            api_key: String::new(),
            grant_id: String::new(),
            bot_name: "AI Notetaker Bot".to_string(),
            calendar_id: "primary".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerSettings {
    /// Maximum number of status checks before a session is declared timed out.
    pub max_checks: u32,
    /// Seconds between status checks.
    pub interval_seconds: u64,
    /// Seconds allowed for downloading a transcript payload.
    pub fetch_timeout_seconds: u64,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            max_checks: 120,
            interval_seconds: 30,
            fetch_timeout_seconds: 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if !config_path.exists() {
            info!(
                "Config file not found, creating default at {:?}",
                config_path
            );
            let config = Self::default().with_env_overrides();
            config.save()?;
            return Ok(config);
        }

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Self = toml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from {:?}", config_path);
        Ok(config.with_env_overrides())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Credentials may come from the environment instead of the config file.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("NYLAS_API_KEY") {
            if !key.is_empty() {
                self.nylas.api_key = key;
            }
        }
        if let Ok(grant) = std::env::var("NYLAS_GRANT_ID") {
            if !grant.is_empty() {
                self.nylas.grant_id = grant;
            }
        }
        if let Ok(uri) = std::env::var("NYLAS_API_URI") {
            if !uri.is_empty() {
                self.nylas.api_uri = uri;
            }
        }
        self
    }

    fn config_path() -> Result<PathBuf> {
        global::config_file()
    }
}
