use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// NTS API endpoint and channel polling bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Lower bound for the live-channel refresh interval.
    #[serde(default = "default_poll_floor_secs")]
    pub poll_floor_secs: u64,
    /// Upper bound for the live-channel refresh interval, also used after a
    /// failed fetch.
    #[serde(default = "default_poll_ceiling_secs")]
    pub poll_ceiling_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Render interface (state snapshot + action intake) served over HTTP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_volume")]
    pub default_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// SQLite cache of channels and mixtapes.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Where the current handoff activity descriptor is published.
    #[serde(default = "default_activity_file")]
    pub activity_file: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_floor_secs: default_poll_floor_secs(),
            poll_ceiling_secs: default_poll_ceiling_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            activity_file: default_activity_file(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.nts.live/api/v2".to_string()
}

fn default_poll_floor_secs() -> u64 {
    30
}

fn default_poll_ceiling_secs() -> u64 {
    900
}

fn default_timeout_secs() -> u64 {
    20
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_volume() -> f32 {
    0.8
}

fn default_database() -> PathBuf {
    platform::data_dir().join("marconio.sqlite")
}

fn default_activity_file() -> PathBuf {
    platform::data_dir().join("current_activity.json")
}

impl ApiConfig {
    pub fn poll_bounds(&self) -> (std::time::Duration, std::time::Duration) {
        let floor = self.poll_floor_secs.min(self.poll_ceiling_secs);
        (
            std::time::Duration::from_secs(floor),
            std::time::Duration::from_secs(self.poll_ceiling_secs),
        )
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
