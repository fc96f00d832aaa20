use serde::{Deserialize, Deserializer};
use std::time::Duration;
use thiserror::Error;

use crate::tracker::{Region, TrackerSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("no API URL configured (set API_URL or api_url)")]
    MissingApiUrl,
    #[error("interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default = "default_vehicle_id")]
    pub vehicle_id: String,
    #[serde(default = "default_interval", deserialize_with = "humantime_duration")]
    pub interval: Duration,
    #[serde(default = "default_animation", deserialize_with = "humantime_duration")]
    pub animation: Duration,
    #[serde(default, deserialize_with = "optional_humantime_duration")]
    pub request_timeout: Option<Duration>,
    #[serde(default)]
    pub initial_region: Region,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        WebConfig {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_vehicle_id() -> String {
    "Vehicle 1".to_string()
}

fn default_interval() -> Duration {
    Duration::from_millis(3000)
}

fn default_animation() -> Duration {
    Duration::from_millis(500)
}

fn humantime_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}

fn optional_humantime_duration<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Duration>, D::Error> {
    Option::<String>::deserialize(deserializer)?
        .map(|s| humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom))
        .transpose()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: None,
            vehicle_id: default_vehicle_id(),
            interval: default_interval(),
            animation: default_animation(),
            request_timeout: None,
            initial_region: Region::default(),
            web: WebConfig::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        Ok(())
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn api_url(&self) -> Result<&str, ConfigError> {
        self.api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingApiUrl)
    }

    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            vehicle_id: self.vehicle_id.clone(),
            interval: self.interval,
            animation: self.animation,
            initial_region: self.initial_region,
        }
    }
}
