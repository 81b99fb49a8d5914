//! Catalog files
//!
//! A catalog is a TOML file naming data sources:
//!
//! ```toml
//! [sources.flights]
//! driver = "csv"
//! args = { urlpath = "https://example.com/flights.csv" }
//!
//! [[sources.flights.cache]]
//! type = "file"
//! argkey = "urlpath"
//! ```

pub mod source;

pub use source::{CacheContext, CacheSpec, DataSource, LoadOutcome, OpenedSource, SourceCache};

use crate::error::{SourceCacheError, SourceCacheResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Prefix marking a catalog served by a remote catalog server
pub const REMOTE_PREFIX: &str = "tcp://";

/// Where a catalog URI points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogLocation {
    /// A file on disk
    Local(PathBuf),
    /// A remote catalog server
    Remote(String),
}

impl CatalogLocation {
    /// Classify a catalog URI by its prefix
    pub fn classify(uri: &str) -> Self {
        if uri.starts_with(REMOTE_PREFIX) {
            Self::Remote(uri.to_string())
        } else {
            Self::Local(PathBuf::from(uri))
        }
    }
}

/// Parsed catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Data sources by name
    pub sources: BTreeMap<String, DataSource>,
}

impl Catalog {
    /// Load a catalog from a URI (local paths only)
    pub async fn load(uri: &str) -> SourceCacheResult<Self> {
        match CatalogLocation::classify(uri) {
            CatalogLocation::Local(path) => Self::from_file(&path).await,
            CatalogLocation::Remote(uri) => Err(SourceCacheError::RemoteCatalog(uri)),
        }
    }

    /// Parse a catalog file
    pub async fn from_file(path: &Path) -> SourceCacheResult<Self> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            SourceCacheError::io(format!("reading catalog {}", path.display()), e)
        })?;
        let catalog = Self::parse(&content, path)?;
        debug!(
            "Loaded catalog {} with {} source(s)",
            path.display(),
            catalog.sources.len()
        );
        Ok(catalog)
    }

    /// Parse catalog text; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> SourceCacheResult<Self> {
        toml::from_str(content).map_err(|e| SourceCacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Look up a source by name
    pub fn source(&self, name: &str) -> SourceCacheResult<&DataSource> {
        self.sources
            .get(name)
            .ok_or_else(|| SourceCacheError::SourceNotFound(name.to_string()))
    }

    /// Look up and open a source
    pub fn open(&self, name: &str, ctx: &CacheContext) -> SourceCacheResult<OpenedSource> {
        self.source(name)?.open(name, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[sources.test_cache]
driver = "csv"
description = "sample csv"
args = { urlpath = "/data/sample.csv" }

[[sources.test_cache.cache]]
type = "file"
argkey = "urlpath"

[sources.arr_cache]
driver = "npy"
args = { path = "/data/arr/*.npy" }

[[sources.arr_cache.cache]]
type = "file"
argkey = "path"
regex = "/data"

[[sources.arr_cache.cache]]
type = "dir"
argkey = "path"
depth = 2
"#;

    #[test]
    fn classify_uris() {
        assert_eq!(
            CatalogLocation::classify("tcp://catalog.example.com:5000"),
            CatalogLocation::Remote("tcp://catalog.example.com:5000".to_string())
        );
        assert_eq!(
            CatalogLocation::classify("catalog.toml"),
            CatalogLocation::Local(PathBuf::from("catalog.toml"))
        );
    }

    #[test]
    fn parse_catalog() {
        let catalog = Catalog::parse(CATALOG, Path::new("catalog.toml")).unwrap();

        assert_eq!(catalog.sources.len(), 2);
        let source = catalog.source("test_cache").unwrap();
        assert_eq!(source.driver, "csv");
        assert_eq!(source.cache[0].kind, "file");
        assert_eq!(source.cache[0].argkey.as_deref(), Some("urlpath"));

        let arr = catalog.source("arr_cache").unwrap();
        assert_eq!(arr.cache.len(), 2);
        assert_eq!(arr.cache[0].regex.as_deref(), Some("/data"));
        assert_eq!(arr.cache[1].depth, Some(2));
    }

    #[test]
    fn missing_source() {
        let catalog = Catalog::parse(CATALOG, Path::new("catalog.toml")).unwrap();
        assert!(matches!(
            catalog.source("nope"),
            Err(SourceCacheError::SourceNotFound(name)) if name == "nope"
        ));
    }

    #[test]
    fn invalid_catalog() {
        let err = Catalog::parse("[sources.x\n", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, SourceCacheError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn remote_catalog_rejected() {
        let err = Catalog::load("tcp://localhost:5000").await.unwrap_err();
        assert!(matches!(err, SourceCacheError::RemoteCatalog(_)));
    }
}
