// # Memory Entry Store
//
// In-memory implementation of EntryStore.
//
// Nothing survives a restart, so the daemon re-runs the setup flow every
// time it starts. Useful for tests and for deployments that pass the API
// key through the environment anyway.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::entry_store::{ConfigEntry, EntryStore};

/// In-memory entry store implementation
///
/// # Example
///
/// ```rust,no_run
/// use parcel_core::store::MemoryEntryStore;
/// use parcel_core::traits::EntryStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryEntryStore::new();
///     assert!(store.list_entries().await?.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEntryStore {
    inner: Arc<RwLock<HashMap<String, ConfigEntry>>>,
}

impl MemoryEntryStore {
    /// Create a new empty memory entry store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn get_entry(&self, entry_id: &str) -> Result<Option<ConfigEntry>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(entry_id).cloned())
    }

    async fn save_entry(&self, entry: &ConfigEntry) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(entry.entry_id.clone(), entry.clone());
        Ok(())
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<bool, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.remove(entry_id).is_some())
    }

    async fn list_entries(&self) -> Result<Vec<ConfigEntry>, Error> {
        let guard = self.inner.read().await;
        let mut entries: Vec<ConfigEntry> = guard.values().cloned().collect();
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    async fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}
