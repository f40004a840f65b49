// # File Entry Store
//
// File-based implementation of EntryStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good file
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "entries": {
//     "3f0c...": {
//       "entry_id": "3f0c...",
//       "title": "Parcel Deliveries",
//       "api_key": "...",
//       "base_url": "https://api.parcel.app/v1",
//       "created_at": "2025-01-09T12:00:00Z"
//     }
//   }
// }
// ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::entry_store::{ConfigEntry, EntryStore};

/// Entry file format version
const ENTRY_FILE_VERSION: &str = "1.0";

/// File-based entry store with crash recovery
///
/// Every mutation is written through immediately. The file holds API keys,
/// so callers should place it somewhere only the daemon user can read.
#[derive(Debug)]
pub struct FileEntryStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

#[derive(Debug)]
struct FileState {
    entries: HashMap<String, ConfigEntry>,
    dirty: bool,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct EntryFileFormat {
    version: String,
    entries: HashMap<String, ConfigEntry>,
}

impl FileEntryStore {
    /// Create or load a file entry store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing entry file
    /// 3. If it is corrupted, load the backup and restore it
    /// 4. If both fail, start empty
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create entry store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let entries = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                entries,
                dirty: false,
            })),
        })
    }

    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, ConfigEntry>, Error> {
        match Self::load(path).await {
            Ok(entries) => {
                tracing::debug!("Loaded entry file: {} entries", entries.len());
                Ok(entries)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Entry file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with no entries.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(entries) => {
                        tracing::info!("Recovered entries from backup: {} entries", entries.len());
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore entry file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(entries)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with no entries.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, ConfigEntry>, Error> {
        if !path.exists() {
            tracing::debug!("Entry file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::entry_store(format!(
                "Failed to read entry file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: EntryFileFormat = serde_json::from_str(&content)?;

        if file.version != ENTRY_FILE_VERSION {
            tracing::warn!(
                "Entry file version mismatch: expected {}, got {}. Attempting to load anyway.",
                ENTRY_FILE_VERSION,
                file.version
            );
        }

        Ok(file.entries)
    }

    /// Write entries to file atomically
    async fn write(&self) -> Result<(), Error> {
        let mut state_guard = self.state.write().await;

        let file = EntryFileFormat {
            version: ENTRY_FILE_VERSION.to_string(),
            entries: state_guard.entries.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::entry_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::entry_store(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.flush().await.map_err(|e| {
                Error::entry_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists()
            && let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await
        {
            tracing::warn!("Failed to create entry backup: {}", e);
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::entry_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        state_guard.dirty = false;
        tracing::trace!("Entries written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl EntryStore for FileEntryStore {
    async fn get_entry(&self, entry_id: &str) -> Result<Option<ConfigEntry>, Error> {
        let state_guard = self.state.read().await;
        Ok(state_guard.entries.get(entry_id).cloned())
    }

    async fn save_entry(&self, entry: &ConfigEntry) -> Result<(), Error> {
        {
            let mut state_guard = self.state.write().await;
            state_guard
                .entries
                .insert(entry.entry_id.clone(), entry.clone());
            state_guard.dirty = true;
        }

        self.write().await
    }

    async fn delete_entry(&self, entry_id: &str) -> Result<bool, Error> {
        let removed = {
            let mut state_guard = self.state.write().await;
            let removed = state_guard.entries.remove(entry_id).is_some();
            state_guard.dirty |= removed;
            removed
        };

        if removed {
            self.write().await?;
        }
        Ok(removed)
    }

    async fn list_entries(&self) -> Result<Vec<ConfigEntry>, Error> {
        let state_guard = self.state.read().await;
        let mut entries: Vec<ConfigEntry> = state_guard.entries.values().cloned().collect();
        entries.sort_by_key(|entry| entry.created_at);
        Ok(entries)
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty { self.write().await } else { Ok(()) }
    }
}
