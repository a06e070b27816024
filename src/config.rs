use chrono::FixedOffset;
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

use crate::source::{Accuracy, SubscriptionOptions};

pub const DEFAULT_SERVER_URL: &str = "https://bus-tracker-server-ajmu.onrender.com";
pub const DEFAULT_TASK_NAME: &str = "BACKGROUND_LOCATION_TASK";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid server url {0:?}: expected http(s):// or ws(s)://")]
    InvalidUrl(String),
    #[error("invalid utc offset {0:?}")]
    InvalidOffset(String),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_reconnect_delay", deserialize_with = "humantime_duration")]
    pub reconnect_delay: Duration,
    #[serde(
        default = "default_reconnect_delay_max",
        deserialize_with = "humantime_duration"
    )]
    pub reconnect_delay_max: Duration,
    #[serde(default = "default_connect_timeout", deserialize_with = "humantime_duration")]
    pub connect_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            reconnect_delay: default_reconnect_delay(),
            reconnect_delay_max: default_reconnect_delay_max(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_task_name")]
    pub task_name: String,
    #[serde(default = "default_interval", deserialize_with = "humantime_duration")]
    pub interval: Duration,
    #[serde(default)]
    pub distance_filter_m: f64,
    #[serde(default)]
    pub accuracy: Accuracy,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            task_name: default_task_name(),
            interval: default_interval(),
            distance_filter_m: 0.0,
            accuracy: Accuracy::default(),
        }
    }
}

impl TrackingConfig {
    pub fn subscription_options(&self) -> SubscriptionOptions {
        SubscriptionOptions {
            interval: self.interval,
            accuracy: self.accuracy,
            distance_filter_m: self.distance_filter_m,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            utc_offset: default_utc_offset(),
        }
    }
}

impl DisplayConfig {
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.utc_offset
            .trim()
            .parse::<FixedOffset>()
            .map_err(|_| ConfigError::InvalidOffset(self.utc_offset.clone()))
    }
}

fn default_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_reconnect_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_reconnect_delay_max() -> Duration {
    Duration::from_secs(5)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_task_name() -> String {
    DEFAULT_TASK_NAME.to_string()
}

fn default_interval() -> Duration {
    Duration::from_secs(2)
}

fn default_capacity() -> usize {
    crate::telemetry::DEFAULT_CAPACITY
}

fn default_utc_offset() -> String {
    "+05:30".to_string()
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.server.url.trim();
        let known_scheme = ["http://", "https://", "ws://", "wss://"]
            .iter()
            .any(|scheme| url.starts_with(scheme));
        if !known_scheme || url.len() <= "wss://".len() {
            return Err(ConfigError::InvalidUrl(self.server.url.clone()));
        }
        if self.tracking.interval.is_zero() {
            return Err(ConfigError::Zero("tracking.interval"));
        }
        if self.server.reconnect_delay.is_zero() {
            return Err(ConfigError::Zero("server.reconnect_delay"));
        }
        if self.server.connect_timeout.is_zero() {
            return Err(ConfigError::Zero("server.connect_timeout"));
        }
        if self.display.capacity == 0 {
            return Err(ConfigError::Zero("display.capacity"));
        }
        self.display.offset()?;
        Ok(())
    }
}
