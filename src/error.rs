//! Error types for sourcecache
//!
//! All modules use `SourceCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for sourcecache operations
pub type SourceCacheResult<T> = Result<T, SourceCacheError>;

/// All errors that can occur in sourcecache
#[derive(Error, Debug)]
pub enum SourceCacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid cache configuration: {reason}")]
    CacheConfig { reason: String },

    // Catalog errors
    #[error("Source not found in catalog: {0}")]
    SourceNotFound(String),

    #[error("Remote catalogs are not supported: {0}")]
    RemoteCatalog(String),

    // Fetch errors
    #[error("Failed to fetch {locator}: {reason}")]
    Fetch { locator: String, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl SourceCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a fetch error for a source locator
    pub fn fetch(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Create a cache configuration error
    pub fn cache_config(reason: impl Into<String>) -> Self {
        Self::CacheConfig {
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Fetch { .. } => Some("Check that the source exists and is reachable, then retry"),
            Self::SourceNotFound(_) => Some("Run: sourcecache sources <catalog>"),
            Self::RemoteCatalog(_) => Some("Download the catalog and pass its local path"),
            Self::CacheConfig { .. } => {
                Some("Cache type must be one of: file, dir, compressed; argkey is required")
            }
            _ => None,
        }
    }
}
