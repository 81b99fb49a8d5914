//! Cache manager: one backend, one cache directory, one metadata store

use crate::cache::backend::{CacheBackend, MaterializeRequest};
use crate::cache::fetch::FetchOptions;
use crate::cache::hasher;
use crate::cache::metadata::{CacheEntry, MetadataStore};
use crate::cache::switch::CachingSwitch;
use crate::error::{SourceCacheError, SourceCacheResult};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Read-only view of a recorded entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheMetadata {
    /// Local path of the cached content
    pub cache_path: PathBuf,
    /// Locator the content came from
    pub original_path: String,
    /// When the content was materialized
    pub created: DateTime<Utc>,
}

impl From<CacheEntry> for CacheMetadata {
    fn from(entry: CacheEntry) -> Self {
        Self {
            cache_path: entry.cache_path,
            original_path: entry.original_path,
            created: entry.created,
        }
    }
}

/// Guarantees local copies of source locators inside a cache directory
pub struct CacheManager {
    cache_dir: PathBuf,
    backend: CacheBackend,
    strip: Option<Regex>,
    fetch: FetchOptions,
    metadata: MetadataStore,
    switch: CachingSwitch,
}

impl CacheManager {
    /// Create a manager bound to the process-wide caching switch
    pub fn new(cache_dir: impl Into<PathBuf>, backend: CacheBackend) -> Self {
        let cache_dir = cache_dir.into();
        Self {
            metadata: MetadataStore::new(&cache_dir),
            cache_dir,
            backend,
            strip: None,
            fetch: FetchOptions::default(),
            switch: CachingSwitch::global(),
        }
    }

    /// Use a specific switch instead of the process-wide one
    pub fn with_switch(mut self, switch: CachingSwitch) -> Self {
        self.switch = switch;
        self
    }

    /// Remove `pattern` from locators before hashing and naming outputs
    pub fn with_strip_pattern(mut self, pattern: Regex) -> Self {
        self.strip = Some(pattern);
        self
    }

    /// Override remote fetch options
    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    /// Root directory of this cache
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Backend used to materialize entries
    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    /// Switch consulted by `load`
    pub fn switch(&self) -> &CachingSwitch {
        &self.switch
    }

    /// Entry directory name for a locator
    pub fn entry_id(&self, locator: &str) -> String {
        match &self.strip {
            Some(pattern) => hasher::entry_id(&pattern.replace(locator, "")),
            None => hasher::entry_id(locator),
        }
    }

    /// Return local paths for `locator`, fetching it on first use
    ///
    /// With caching disabled the locator itself is returned and nothing on
    /// disk is touched. A recorded entry whose files all still exist is
    /// returned as-is; anything else is materialized again.
    pub async fn load(&self, locator: &str) -> SourceCacheResult<Vec<PathBuf>> {
        if !self.switch.is_enabled() {
            debug!("Caching disabled, passing through {}", locator);
            return Ok(vec![PathBuf::from(locator)]);
        }

        let entry_id = self.entry_id(locator);

        let existing = self.recorded_paths(locator).await;
        if !existing.is_empty() && existing.iter().all(|p| p.exists()) {
            debug!("Cache hit for {} ({})", locator, entry_id);
            return Ok(existing);
        }

        debug!("Cache miss for {} ({})", locator, entry_id);
        let request = MaterializeRequest {
            locator: locator.to_string(),
            cache_dir: self.cache_dir.clone(),
            entry_id: entry_id.clone(),
            strip: self.strip.clone(),
            fetch: self.fetch.clone(),
        };
        let backend = self.backend.clone();
        let paths = tokio::task::spawn_blocking(move || backend.materialize(&request))
            .await
            .map_err(|e| SourceCacheError::Internal(format!("materialize task failed: {}", e)))??;

        let entries = paths
            .iter()
            .map(|path| CacheEntry::new(path.clone(), locator, &entry_id))
            .collect();
        self.metadata.record_all(locator, entries).await?;

        info!(
            "Cached {} into {} ({} file(s))",
            locator,
            self.cache_dir.join(&entry_id).display(),
            paths.len()
        );
        Ok(paths)
    }

    /// Recorded entries for a locator
    pub async fn get_metadata(&self, locator: &str) -> Vec<CacheMetadata> {
        self.metadata
            .get(locator)
            .await
            .into_iter()
            .map(CacheMetadata::from)
            .collect()
    }

    /// Every locator with recorded entries
    pub async fn tracked_locators(&self) -> Vec<String> {
        self.metadata.keys().await
    }

    /// Delete cached content for a locator and forget it
    pub async fn clear_cache(&self, locator: &str) -> SourceCacheResult<()> {
        let entries = self.metadata.get(locator).await;
        if entries.is_empty() {
            debug!("Nothing cached for {}", locator);
            return Ok(());
        }

        // Only well-formed ids, so a tampered store cannot point outside cache_dir
        let mut entry_dirs: Vec<PathBuf> = entries
            .iter()
            .filter(|e| hasher::is_entry_id(&e.entry_id))
            .map(|e| self.cache_dir.join(&e.entry_id))
            .collect();
        entry_dirs.dedup();

        for dir in &entry_dirs {
            remove_path(dir).await?;
        }

        self.metadata.remove(locator).await?;
        info!("Cleared cache for {}", locator);
        Ok(())
    }

    /// Delete the whole cache directory, metadata included
    pub async fn clear_all(&self) -> SourceCacheResult<()> {
        remove_path(&self.cache_dir).await?;
        self.metadata.reset().await;
        info!("Cleared cache directory {}", self.cache_dir.display());
        Ok(())
    }

    async fn recorded_paths(&self, locator: &str) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in self.metadata.get(locator).await {
            if !paths.contains(&entry.cache_path) {
                paths.push(entry.cache_path);
            }
        }
        paths
    }
}

async fn remove_path(path: &Path) -> SourceCacheResult<()> {
    let result = match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await,
        Ok(_) => fs::remove_file(path).await,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SourceCacheError::io(format!("removing {}", path.display()), e)),
    }
}
