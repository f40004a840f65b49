// Daemon configuration, read from environment variables only.

use anyhow::{Context, Result};
use parcel_core::config::{DEFAULT_API_URL, DEFAULT_NAME_PREFIX};
use parcel_core::{CoordinatorConfig, ParcelConfig, SensorConfig, SourceConfig};
use std::path::PathBuf;

/// Margin between the HTTP client timeout and the coordinator's fetch bound
const FETCH_TIMEOUT_MARGIN_SECS: u64 = 5;

/// Application configuration
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub name_prefix: String,
    pub scan_interval_secs: u64,
    pub min_refresh_interval_secs: u64,
    pub http_timeout_secs: u64,
    pub entry_store_path: Option<PathBuf>,
    pub log_level: String,
}

// Never print the API key
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<REDACTED>")
            .field("api_url", &self.api_url)
            .field("name_prefix", &self.name_prefix)
            .field("scan_interval_secs", &self.scan_interval_secs)
            .field("min_refresh_interval_secs", &self.min_refresh_interval_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("entry_store_path", &self.entry_store_path)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let number = |name: &str, default: u64| -> Result<u64> {
            match lookup(name) {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a whole number of seconds. Got: {}", name, raw)),
                None => Ok(default),
            }
        };

        Ok(Self {
            api_key: lookup("PARCEL_API_KEY").context(
                "PARCEL_API_KEY is required. Set it via: export PARCEL_API_KEY=your_key",
            )?,
            api_url: lookup("PARCEL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            name_prefix: lookup("PARCEL_NAME").unwrap_or_else(|| DEFAULT_NAME_PREFIX.to_string()),
            scan_interval_secs: number("PARCEL_SCAN_INTERVAL_SECS", 1800)?,
            min_refresh_interval_secs: number("PARCEL_MIN_REFRESH_INTERVAL_SECS", 60)?,
            http_timeout_secs: number("PARCEL_HTTP_TIMEOUT_SECS", 10)?,
            entry_store_path: lookup("PARCEL_ENTRY_STORE_PATH")
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
            log_level: lookup("PARCEL_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!(
                "PARCEL_API_KEY is required. Set it via: export PARCEL_API_KEY=your_key"
            );
        }

        let key_lower = self.api_key.to_lowercase();
        if key_lower.contains("your_key") || key_lower.contains("replace_me") {
            anyhow::bail!(
                "PARCEL_API_KEY appears to be a placeholder. \
                Use the API key from the Parcel app settings."
            );
        }

        if !self.api_url.starts_with("https://") && !self.api_url.starts_with("http://") {
            anyhow::bail!(
                "PARCEL_API_URL must use HTTP or HTTPS scheme. Got: {}",
                self.api_url
            );
        }

        if !(60..=86400).contains(&self.scan_interval_secs) {
            anyhow::bail!(
                "PARCEL_SCAN_INTERVAL_SECS must be between 60 and 86400 seconds. Got: {}",
                self.scan_interval_secs
            );
        }

        if self.min_refresh_interval_secs > self.scan_interval_secs {
            anyhow::bail!(
                "PARCEL_MIN_REFRESH_INTERVAL_SECS ({}) cannot exceed PARCEL_SCAN_INTERVAL_SECS ({})",
                self.min_refresh_interval_secs,
                self.scan_interval_secs
            );
        }

        if !(1..=120).contains(&self.http_timeout_secs) {
            anyhow::bail!(
                "PARCEL_HTTP_TIMEOUT_SECS must be between 1 and 120 seconds. Got: {}",
                self.http_timeout_secs
            );
        }

        if let Some(parent) = self.entry_store_path.as_deref().and_then(|p| p.parent())
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "PARCEL_ENTRY_STORE_PATH parent directory does not exist: {}. \
                Create it first: mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "PARCEL_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Core library configuration for polling with the given key
    pub fn parcel_config(&self, api_key: &str, base_url: &str) -> ParcelConfig {
        ParcelConfig {
            source: SourceConfig::ParcelApp {
                api_key: api_key.to_string(),
                base_url: base_url.to_string(),
                timeout_secs: self.http_timeout_secs,
            },
            coordinator: CoordinatorConfig {
                scan_interval_secs: self.scan_interval_secs,
                min_refresh_interval_secs: self.min_refresh_interval_secs,
                fetch_timeout_secs: self.http_timeout_secs + FETCH_TIMEOUT_MARGIN_SECS,
                ..CoordinatorConfig::default()
            },
            sensors: SensorConfig {
                name_prefix: self.name_prefix.clone(),
            },
        }
    }
}
