//! Account setup flow
//!
//! An API key is only persisted after the tracking API has accepted it.
//! The flow builds a throwaway source for the submitted key through the
//! [`SourceRegistry`], performs one fetch, and maps the outcome:
//!
//! | fetch result                | outcome                       |
//! |-----------------------------|-------------------------------|
//! | `Ok`                        | entry saved, `Ok(ConfigEntry)`|
//! | `Err(Error::Authentication)`| `SetupError::InvalidAuth`     |
//! | any other `Err`             | `SetupError::CannotConnect`   |

use std::sync::Arc;

use thiserror::Error;

use crate::config::{DEFAULT_API_URL, SourceConfig};
use crate::error::Error;
use crate::registry::SourceRegistry;
use crate::traits::EntryStore;

pub use crate::traits::ConfigEntry;

/// Title given to every entry created by the flow
pub const ENTRY_TITLE: &str = "Parcel Deliveries";

/// Reasons a setup attempt is rejected
#[derive(Error, Debug)]
pub enum SetupError {
    /// The API refused the key
    #[error("Invalid API key")]
    InvalidAuth,

    /// The API could not be reached or answered unexpectedly
    #[error("Cannot connect to the tracking API: {0}")]
    CannotConnect(String),

    /// An entry with the same key already exists
    #[error("This API key is already configured")]
    AlreadyConfigured,

    /// The submitted key was empty
    #[error("API key cannot be empty")]
    EmptyApiKey,

    /// The entry store failed
    #[error(transparent)]
    Store(#[from] Error),
}

impl ConfigEntry {
    /// Source configuration for polling this entry's account
    pub fn source_config(&self, timeout_secs: u64) -> SourceConfig {
        SourceConfig::ParcelApp {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout_secs,
        }
    }
}

/// Validates API keys and persists accepted ones
pub struct SetupFlow {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn EntryStore>,
    base_url: String,
    timeout_secs: u64,
}

impl SetupFlow {
    /// Create a flow against the public API
    pub fn new(registry: Arc<SourceRegistry>, store: Arc<dyn EntryStore>) -> Self {
        Self {
            registry,
            store,
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Validate against a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// HTTP timeout for the validation request
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate a key and persist it as a new entry
    pub async fn submit(&self, api_key: &str) -> Result<ConfigEntry, SetupError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(SetupError::EmptyApiKey);
        }

        let existing = self.store.list_entries().await?;
        if existing.iter().any(|entry| entry.api_key == api_key) {
            return Err(SetupError::AlreadyConfigured);
        }

        let config = SourceConfig::ParcelApp {
            api_key: api_key.to_string(),
            base_url: self.base_url.clone(),
            timeout_secs: self.timeout_secs,
        };
        let source = self
            .registry
            .create_source(&config)
            .map_err(|e| SetupError::CannotConnect(e.to_string()))?;

        match source.check_credentials().await {
            Ok(()) => {}
            Err(e) if e.is_auth() => {
                tracing::warn!("Setup rejected: {}", e);
                return Err(SetupError::InvalidAuth);
            }
            Err(e) => {
                tracing::error!("Setup could not reach {}: {}", source.source_name(), e);
                return Err(SetupError::CannotConnect(e.to_string()));
            }
        }

        let entry = ConfigEntry::new(ENTRY_TITLE, api_key, self.base_url.clone());
        self.store.save_entry(&entry).await?;
        tracing::info!("Created config entry {} ({})", entry.entry_id, entry.title);

        Ok(entry)
    }

    /// Remove a previously created entry
    ///
    /// Returns `false` if no entry had that id.
    pub async fn unload(&self, entry_id: &str) -> Result<bool, SetupError> {
        let removed = self.store.delete_entry(entry_id).await?;
        if removed {
            tracing::info!("Unloaded config entry {}", entry_id);
        }
        Ok(removed)
    }

    /// Entries created so far, oldest first
    pub async fn entries(&self) -> Result<Vec<ConfigEntry>, SetupError> {
        Ok(self.store.list_entries().await?)
    }
}

impl std::fmt::Debug for SetupFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetupFlow")
            .field("registry", &self.registry)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}
