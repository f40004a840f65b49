// # Entry Store Trait
//
// Defines the interface for persisting validated config entries.
//
// ## Purpose
//
// A config entry is created once the setup flow has confirmed that an API
// key is accepted by the tracking API. Persisting it lets the daemon start
// polling again after a restart without re-running setup.
//
// ## Implementations
//
// - In-memory: `MemoryEntryStore`
// - File-based (JSON, atomic writes, backup recovery): `FileEntryStore`

use async_trait::async_trait;

/// A validated account configuration
#[derive(Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfigEntry {
    /// Unique entry identifier
    pub entry_id: String,
    /// Display title of the entry
    pub title: String,
    /// Bearer token accepted by the API
    pub api_key: String,
    /// API base URL the key was validated against
    pub base_url: String,
    /// When the entry was created
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// Never print the API key
impl std::fmt::Debug for ConfigEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigEntry")
            .field("entry_id", &self.entry_id)
            .field("title", &self.title)
            .field("api_key", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl ConfigEntry {
    /// Create a new entry with a fresh id
    ///
    /// This is `pub(crate)` so entries only come out of a successful setup flow.
    pub(crate) fn new(
        title: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            entry_id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Trait for config entry store implementations
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Get an entry by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(ConfigEntry))`: The entry
    /// - `Ok(None)`: No entry with that id
    /// - `Err(Error)`: Storage error
    async fn get_entry(&self, entry_id: &str) -> Result<Option<ConfigEntry>, crate::Error>;

    /// Create or replace an entry
    async fn save_entry(&self, entry: &ConfigEntry) -> Result<(), crate::Error>;

    /// Delete an entry
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The entry existed and was removed
    /// - `Ok(false)`: No entry with that id
    /// - `Err(Error)`: Storage error
    async fn delete_entry(&self, entry_id: &str) -> Result<bool, crate::Error>;

    /// List all entries, oldest first
    async fn list_entries(&self) -> Result<Vec<ConfigEntry>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
