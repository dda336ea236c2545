//! Configuration loading from a TOML file and environment variables.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::notification::PayloadEncoding;

/// Channel name used when no topic is configured.
pub const DEFAULT_TOPIC: &str = "my_channel";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// Broker connection settings.
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Topic for tables without their own route.
    #[serde(default = "default_topic")]
    pub topic: String,

    /// Wire format of the notification body.
    #[serde(default)]
    pub encoding: PayloadEncoding,

    /// Per-table column and topic overrides.
    #[serde(default)]
    pub tables: HashMap<String, TableRoute>,
}

/// Broker connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Broker address, e.g. `nats://localhost:4222`. Unset disables publishing.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Upper bound for one publish call on the commit path.
    #[serde(default = "default_publish_timeout_ms")]
    pub publish_timeout_ms: u64,

    /// Client connection name reported to the broker.
    #[serde(default)]
    pub name: Option<String>,
}

/// What to publish for one table, and where.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableRoute {
    /// Columns to publish. Empty means the first column of the row.
    #[serde(default)]
    pub columns: Vec<String>,

    /// Topic override for this table.
    #[serde(default)]
    pub topic: Option<String>,
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_publish_timeout_ms() -> u64 {
    5_000
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            broker: BrokerConfig::default(),
            topic: default_topic(),
            encoding: PayloadEncoding::default(),
            tables: HashMap::new(),
        }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            publish_timeout_ms: default_publish_timeout_ms(),
            name: None,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is not usable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl NotifyConfig {
    /// Configuration publishing to `url` with every other setting defaulted.
    pub fn with_broker_url(url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.broker.url = Some(url.into());
        config
    }

    /// Parse a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides looked up by variable name.
    ///
    /// - `TXN_NOTIFY_BROKER_URL` overrides `broker.url` (empty clears it)
    /// - `TXN_NOTIFY_TOPIC` overrides `topic`
    /// - `TXN_NOTIFY_ENCODING` overrides `encoding` (`json` or `bitcode`)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TXN_NOTIFY_BROKER_URL") {
            let url = url.trim();
            self.broker.url = (!url.is_empty()).then(|| url.to_string());
        }
        if let Some(topic) = lookup("TXN_NOTIFY_TOPIC") {
            self.topic = topic;
        }
        if let Some(encoding) = lookup("TXN_NOTIFY_ENCODING") {
            self.encoding = encoding
                .parse()
                .map_err(|err| ConfigError::Invalid(format!("TXN_NOTIFY_ENCODING: {}", err)))?;
        }
        Ok(())
    }

    /// Reject settings that would only fail later, on the commit path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("topic must not be empty".to_string()));
        }
        if matches!(self.broker.url.as_deref(), Some(url) if url.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "broker.url must not be empty; omit it to disable publishing".to_string(),
            ));
        }
        for (table, route) in &self.tables {
            if matches!(route.topic.as_deref(), Some(topic) if topic.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "tables.{}.topic must not be empty",
                    table
                )));
            }
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`NotifyConfig::apply_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if the result fails validation.
pub fn load_config(path: Option<&Path>) -> Result<NotifyConfig, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => NotifyConfig::from_toml(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %p.display(), "config file not found, using defaults");
                NotifyConfig::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => NotifyConfig::default(),
    };

    config.apply_overrides(|name| std::env::var(name).ok())?;
    config.validate()?;
    Ok(config)
}
