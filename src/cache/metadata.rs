//! Persisted cache metadata
//!
//! Maps each original locator to the entries materialized for it, in the
//! order they were created. Stored as pretty JSON at
//! `<cache_dir>/cache_metadata.json` so it can be inspected by hand.
//!
//! The file is a record of facts about the cache directory, not the source of
//! truth: a missing or unreadable file is an empty store.

use crate::error::{SourceCacheError, SourceCacheResult};
use chrono::{DateTime, Utc};
use fs4::tokio::AsyncFileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

/// File name of the metadata store inside a cache directory
pub const METADATA_FILENAME: &str = "cache_metadata.json";

/// File name of the advisory lock guarding metadata writes
pub const LOCK_FILENAME: &str = "cache_metadata.lock";

type EntryMap = BTreeMap<String, Vec<CacheEntry>>;

/// One materialized copy of a source locator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Local path the content was written to
    pub cache_path: PathBuf,

    /// Locator the content came from
    pub original_path: String,

    /// When the content was materialized
    pub created: DateTime<Utc>,

    /// Name of the entry directory holding `cache_path`
    pub entry_id: String,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    pub fn new(cache_path: PathBuf, original_path: &str, entry_id: &str) -> Self {
        Self {
            cache_path,
            original_path: original_path.to_string(),
            created: Utc::now(),
            entry_id: entry_id.to_string(),
        }
    }
}

/// Metadata store for a single cache directory
pub struct MetadataStore {
    path: PathBuf,
    lock_path: PathBuf,
    entries: Mutex<Option<EntryMap>>,
}

impl MetadataStore {
    /// Create a store for the given cache directory (nothing is read yet)
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            path: cache_dir.join(METADATA_FILENAME),
            lock_path: cache_dir.join(LOCK_FILENAME),
            entries: Mutex::new(None),
        }
    }

    /// Path of the metadata file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries recorded for a locator, oldest first
    pub async fn get(&self, original_path: &str) -> Vec<CacheEntry> {
        self.loaded()
            .await
            .as_ref()
            .and_then(|entries| entries.get(original_path).cloned())
            .unwrap_or_default()
    }

    /// Every tracked locator
    pub async fn keys(&self) -> Vec<String> {
        self.loaded()
            .await
            .as_ref()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Append an entry for a locator and persist
    pub async fn record(&self, original_path: &str, entry: CacheEntry) -> SourceCacheResult<()> {
        self.record_all(original_path, vec![entry]).await
    }

    /// Append several entries for a locator in one write
    ///
    /// Records whose `cache_path` no longer exists are dropped first, so the
    /// store never points at content that is gone.
    pub async fn record_all(
        &self,
        original_path: &str,
        new_entries: Vec<CacheEntry>,
    ) -> SourceCacheResult<()> {
        self.mutate(|map| {
            let list = map.entry(original_path.to_string()).or_default();
            list.retain(|e| e.cache_path.exists());
            list.extend(new_entries);
        })
        .await
    }

    /// Drop records for a locator whose `cache_path` is gone; returns how many
    pub async fn prune_missing(&self, original_path: &str) -> SourceCacheResult<usize> {
        let stale = self
            .get(original_path)
            .await
            .iter()
            .filter(|e| !e.cache_path.exists())
            .count();
        if stale == 0 {
            return Ok(0);
        }

        self.mutate(|map| {
            if let Some(list) = map.get_mut(original_path) {
                list.retain(|e| e.cache_path.exists());
                if list.is_empty() {
                    map.remove(original_path);
                }
            }
        })
        .await?;
        Ok(stale)
    }

    /// Delete all entries for a locator and persist
    pub async fn remove(&self, original_path: &str) -> SourceCacheResult<()> {
        self.mutate(|map| {
            map.remove(original_path);
        })
        .await
    }

    /// Clear the whole store and persist
    pub async fn remove_all(&self) -> SourceCacheResult<()> {
        self.mutate(|map| map.clear()).await
    }

    /// Forget the in-memory copy; the next access reads the file again
    pub async fn reset(&self) {
        *self.entries.lock().await = None;
    }

    async fn loaded(&self) -> MutexGuard<'_, Option<EntryMap>> {
        let mut guard = self.entries.lock().await;
        if guard.is_none() {
            *guard = Some(self.read_from_disk().await);
        }
        guard
    }

    /// Read-modify-write under the in-process mutex and the file lock.
    ///
    /// The file is re-read under the lock so writes from other processes
    /// sharing the directory are merged rather than overwritten.
    async fn mutate<F>(&self, f: F) -> SourceCacheResult<()>
    where
        F: FnOnce(&mut EntryMap),
    {
        let mut guard = self.entries.lock().await;
        let lock = self.acquire_lock().await?;

        let mut entries = self.read_from_disk().await;
        f(&mut entries);
        self.write_to_disk(&entries).await?;

        drop(lock);
        *guard = Some(entries);
        Ok(())
    }

    async fn acquire_lock(&self) -> SourceCacheResult<fs::File> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                SourceCacheError::io(format!("creating cache directory {}", parent.display()), e)
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .await
            .map_err(|e| {
                SourceCacheError::io(format!("opening lock file {}", self.lock_path.display()), e)
            })?;

        // Released when the file is dropped
        file.lock_exclusive().map_err(|e| {
            SourceCacheError::io(format!("locking {}", self.lock_path.display()), e)
        })?;

        Ok(file)
    }

    async fn read_from_disk(&self) -> EntryMap {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return EntryMap::new(),
            Err(e) => {
                warn!(
                    "Unreadable cache metadata {}, treating as empty: {}",
                    self.path.display(),
                    e
                );
                return EntryMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    "Corrupt cache metadata {}, previously cached content is untracked: {}",
                    self.path.display(),
                    e
                );
                EntryMap::new()
            }
        }
    }

    async fn write_to_disk(&self, entries: &EntryMap) -> SourceCacheResult<()> {
        let content = serde_json::to_string_pretty(entries)?;

        // Write to a temporary file first, then rename atomically
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await.map_err(|e| {
            SourceCacheError::io(format!("writing metadata file {}", temp_path.display()), e)
        })?;

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(SourceCacheError::io(
                format!("replacing metadata file {}", self.path.display()),
                e,
            ));
        }

        debug!(
            "Saved metadata for {} locator(s) to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
