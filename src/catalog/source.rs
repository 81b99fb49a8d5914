//! Data sources and their declared caches
//!
//! A source declares zero or more `[[sources.<name>.cache]]` blocks. Opening
//! the source builds one independent [`CacheManager`] per block, each with its
//! own cache directory and metadata store.

use crate::cache::{
    CacheBackend, CacheManager, CacheMetadata, CachingSwitch, Compression, FetchOptions,
};
use crate::config::CacheConfig;
use crate::error::{SourceCacheError, SourceCacheResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// One declared cache on a data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSpec {
    /// Backend type: `file`, `dir` or `compressed`
    #[serde(rename = "type")]
    pub kind: String,

    /// Name of the source argument holding the locator(s)
    pub argkey: Option<String>,

    /// Pattern removed from locators before hashing and naming outputs
    pub regex: Option<String>,

    /// Recursion depth for `dir` caches
    pub depth: Option<usize>,

    /// Archive format for `compressed` caches (inferred when absent)
    pub decompress: Option<String>,

    /// Explicit cache directory; defaults to `<root>/<source>-<index>`
    pub cache_dir: Option<PathBuf>,
}

/// Process-level settings shared by every manager a source opens
#[derive(Debug, Clone)]
pub struct CacheContext {
    /// Root for cache directories without an explicit `cache_dir`
    pub root: PathBuf,
    /// Switch handed to every manager
    pub switch: CachingSwitch,
    /// Remote fetch options
    pub fetch: FetchOptions,
    /// Depth for `dir` caches that don't set one
    pub default_depth: usize,
}

impl CacheContext {
    /// Context backed by the process-wide switch
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            root: config.root_dir(),
            switch: CachingSwitch::global(),
            fetch: config.fetch_options(),
            default_depth: config.default_depth,
        }
    }

    /// Replace the switch (for isolated use, e.g. tests)
    pub fn with_switch(mut self, switch: CachingSwitch) -> Self {
        self.switch = switch;
        self
    }
}

/// A catalog entry describing one data source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSource {
    /// Driver name (consumed by the caller, not interpreted here)
    pub driver: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Driver arguments; string or string-array values can feed caches
    pub args: BTreeMap<String, toml::Value>,

    /// Declared caches, in load order
    pub cache: Vec<CacheSpec>,
}

impl DataSource {
    /// Locators held by a source argument (a string or array of strings)
    pub fn locators(&self, argkey: &str) -> SourceCacheResult<Vec<String>> {
        let value = self.args.get(argkey).ok_or_else(|| {
            SourceCacheError::cache_config(format!("source has no argument named {}", argkey))
        })?;

        match value {
            toml::Value::String(s) => Ok(vec![s.clone()]),
            toml::Value::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        SourceCacheError::cache_config(format!(
                            "argument {} must contain only strings",
                            argkey
                        ))
                    })
                })
                .collect(),
            _ => Err(SourceCacheError::cache_config(format!(
                "argument {} must be a string or list of strings",
                argkey
            ))),
        }
    }

    /// Build one manager per declared cache
    ///
    /// Malformed declarations fail here rather than at load time.
    pub fn open(&self, name: &str, ctx: &CacheContext) -> SourceCacheResult<OpenedSource> {
        let mut caches = Vec::with_capacity(self.cache.len());

        for (index, spec) in self.cache.iter().enumerate() {
            let argkey = spec.argkey.as_deref().ok_or_else(|| {
                SourceCacheError::cache_config(format!(
                    "cache {} of source {} is missing argkey",
                    index, name
                ))
            })?;

            let backend = CacheBackend::from_spec(
                &spec.kind,
                spec.depth.or(Some(ctx.default_depth)),
                spec.decompress.as_deref(),
            )?;
            let locators = self.locators(argkey)?;

            if let CacheBackend::Compressed { decompress: None } = backend {
                if let Some(locator) = locators.iter().find(|l| Compression::infer(l).is_none()) {
                    return Err(SourceCacheError::cache_config(format!(
                        "cannot infer archive format of {}; set decompress",
                        locator
                    )));
                }
            }

            let cache_dir = match &spec.cache_dir {
                Some(dir) => dir.clone(),
                None => ctx.root.join(format!("{}-{}", dir_safe(name)?, index)),
            };

            let mut manager = CacheManager::new(cache_dir, backend)
                .with_switch(ctx.switch.clone())
                .with_fetch_options(ctx.fetch.clone());

            if let Some(pattern) = &spec.regex {
                let regex = Regex::new(pattern).map_err(|e| {
                    SourceCacheError::cache_config(format!("invalid regex {}: {}", pattern, e))
                })?;
                manager = manager.with_strip_pattern(regex);
            }

            debug!(
                "Opened {} cache for {} at {}",
                manager.backend(),
                name,
                manager.cache_dir().display()
            );

            caches.push(SourceCache {
                argkey: argkey.to_string(),
                locators,
                manager,
            });
        }

        Ok(OpenedSource {
            name: name.to_string(),
            caches,
        })
    }
}

/// Source name usable as a single directory component under the cache root
fn dir_safe(name: &str) -> SourceCacheResult<&str> {
    let mut components = Path::new(name).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part.to_str() == Some(name)
    );
    if single && !name.contains(['/', '\\']) {
        Ok(name)
    } else {
        Err(SourceCacheError::cache_config(format!(
            "source name {:?} cannot name a cache directory; set cache_dir",
            name
        )))
    }
}

/// A declared cache bound to the locators it serves
pub struct SourceCache {
    /// Argument the locators came from
    pub argkey: String,
    /// Locators to load through this cache
    pub locators: Vec<String>,
    /// Manager owning this cache's directory
    pub manager: CacheManager,
}

/// Result of loading one locator through one cache
#[derive(Debug, Clone, Serialize)]
pub struct LoadOutcome {
    /// Cache directory that served the load
    pub cache_dir: PathBuf,
    /// Locator that was loaded
    pub locator: String,
    /// Local paths returned by the manager
    pub paths: Vec<PathBuf>,
}

/// A data source with its caches ready
pub struct OpenedSource {
    name: String,
    caches: Vec<SourceCache>,
}

impl OpenedSource {
    /// Source name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared caches in order
    pub fn caches(&self) -> &[SourceCache] {
        &self.caches
    }

    /// Load every locator through every cache, in declared order
    pub async fn load_all(&self) -> SourceCacheResult<Vec<LoadOutcome>> {
        let mut outcomes = Vec::new();
        for cache in &self.caches {
            for locator in &cache.locators {
                let paths = cache.manager.load(locator).await?;
                outcomes.push(LoadOutcome {
                    cache_dir: cache.manager.cache_dir().to_path_buf(),
                    locator: locator.clone(),
                    paths,
                });
            }
        }
        Ok(outcomes)
    }

    /// Recorded metadata for every locator of every cache
    pub async fn metadata(&self) -> Vec<CacheMetadata> {
        let mut records = Vec::new();
        for cache in &self.caches {
            for locator in &cache.locators {
                records.extend(cache.manager.get_metadata(locator).await);
            }
        }
        records
    }

    /// Clear the entries of every locator, leaving other content in place
    pub async fn clear(&self) -> SourceCacheResult<()> {
        for cache in &self.caches {
            for locator in &cache.locators {
                cache.manager.clear_cache(locator).await?;
            }
        }
        Ok(())
    }

    /// Remove every cache directory of this source
    pub async fn clear_all(&self) -> SourceCacheResult<()> {
        for cache in &self.caches {
            cache.manager.clear_all().await?;
        }
        Ok(())
    }
}
