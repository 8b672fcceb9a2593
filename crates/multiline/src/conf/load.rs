//! Load — config loading from file and environment variables.

use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

use super::model::CollectorConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/multiline/collector.toml";

impl CollectorConfig {
    /// Load configuration from file and environment variables.
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = std::env::var("MULTILINE_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using defaults", config_path);
            Self::default()
        };

        let config = config.with_overrides(|key| std::env::var(key).ok());
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(timeout_ms) = parse_var(&lookup, "MULTILINE_TIMEOUT_MS") {
            self.timeout_ms = timeout_ms;
        }
        if let Some(size_limit) = parse_var(&lookup, "MULTILINE_SIZE_LIMIT") {
            self.size_limit = size_limit;
        }
        if let Some(capacity) = parse_var(&lookup, "MULTILINE_CHANNEL_CAPACITY") {
            self.channel_capacity = capacity;
        }
        self
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}
