//! Configuration types for the parcel poller
//!
//! This module defines all configuration structures used throughout the crate.
//! Nothing here is global: the daemon builds one [`ParcelConfig`] per account
//! and passes it down explicitly.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base URL of the public tracking API
pub const DEFAULT_API_URL: &str = "https://api.parcel.app/v1";

/// Prefix used for entity display names
pub const DEFAULT_NAME_PREFIX: &str = "Parcel";

/// Main configuration for one tracked account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelConfig {
    /// Shipment source configuration
    pub source: SourceConfig,

    /// Polling settings
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Entity presentation settings
    #[serde(default)]
    pub sensors: SensorConfig,
}

impl ParcelConfig {
    /// Create a configuration for the public API with default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            source: SourceConfig::ParcelApp {
                api_key: api_key.into(),
                base_url: DEFAULT_API_URL.to_string(),
                timeout_secs: default_timeout_secs(),
            },
            coordinator: CoordinatorConfig::default(),
            sensors: SensorConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.source.validate()?;
        self.coordinator.validate()?;
        Ok(())
    }
}

/// Shipment source configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// The parcel.app REST API
    ParcelApp {
        /// Bearer token for the API
        api_key: String,
        /// API base URL, without the trailing `/shipments`
        #[serde(default = "default_api_url")]
        base_url: String,
        /// HTTP request timeout in seconds
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },

    /// Custom source
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

// Keeps the API key out of logs
impl std::fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceConfig::ParcelApp {
                base_url,
                timeout_secs,
                ..
            } => f
                .debug_struct("ParcelApp")
                .field("api_key", &"<REDACTED>")
                .field("base_url", base_url)
                .field("timeout_secs", timeout_secs)
                .finish(),
            SourceConfig::Custom { factory, config } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", config)
                .finish(),
        }
    }
}

impl SourceConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            SourceConfig::ParcelApp {
                api_key,
                base_url,
                timeout_secs,
            } => {
                if api_key.trim().is_empty() {
                    return Err(crate::Error::config("Parcel API key cannot be empty"));
                }
                if !base_url.starts_with("https://") && !base_url.starts_with("http://") {
                    return Err(crate::Error::config(format!(
                        "Parcel API URL must use HTTP or HTTPS scheme. Got: {}",
                        base_url
                    )));
                }
                if *timeout_secs == 0 {
                    return Err(crate::Error::config("HTTP timeout must be > 0"));
                }
                Ok(())
            }
            SourceConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom source factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom source config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            SourceConfig::ParcelApp { .. } => "parcel_app",
            SourceConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Interval between scheduled refreshes (in seconds)
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Minimum time between a previous attempt and a scheduled refresh (in seconds)
    ///
    /// Manual refreshes ignore this. Set to 0 to disable throttling.
    #[serde(default = "default_min_refresh_interval_secs")]
    pub min_refresh_interval_secs: u64,

    /// Upper bound on a single fetch, including the HTTP round trip (in seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Capacity of the coordinator event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl CoordinatorConfig {
    /// Validate the coordinator settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.scan_interval_secs == 0 {
            return Err(crate::Error::config("Scan interval must be > 0"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(crate::Error::config("Fetch timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.min_refresh_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            min_refresh_interval_secs: default_min_refresh_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Entity presentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Prefix for every entity display name
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_scan_interval_secs() -> u64 {
    1800
}

fn default_min_refresh_interval_secs() -> u64 {
    60
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_name_prefix() -> String {
    DEFAULT_NAME_PREFIX.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: ParcelConfig = serde_json::from_value(serde_json::json!({
            "source": { "type": "parcel_app", "api_key": "k-123" }
        }))
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.source.type_name(), "parcel_app");
        assert_eq!(config.coordinator.scan_interval(), Duration::from_secs(1800));
        assert_eq!(config.sensors.name_prefix, "Parcel");
        match &config.source {
            SourceConfig::ParcelApp { base_url, .. } => assert_eq!(base_url, DEFAULT_API_URL),
            other => panic!("unexpected source: {:?}", other),
        }
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = ParcelConfig::new("   ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_scan_interval_rejected() {
        let mut config = ParcelConfig::new("k-123");
        config.coordinator.scan_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_not_exposed_in_debug() {
        let config = ParcelConfig::new("secret_key_98765");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_key_98765"));
        assert!(debug_str.contains("<REDACTED>"));
    }
}
