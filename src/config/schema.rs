//! Configuration schema for sourcecache
//!
//! Configuration is stored at `~/.config/sourcecache/config.toml`

use crate::cache::fetch::FetchOptions;
use crate::cache::DEFAULT_DEPTH;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable caching (default: true). When false, loads pass locators through
    pub enabled: bool,

    /// Root under which per-source cache directories are created
    pub root: Option<PathBuf>,

    /// Timeout for remote downloads in seconds
    pub http_timeout_secs: u64,

    /// Recursion depth for directory caches that don't set one
    pub default_depth: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            root: None,
            http_timeout_secs: 60,
            default_depth: DEFAULT_DEPTH,
        }
    }
}

impl CacheConfig {
    /// Configured cache root, or the platform cache directory
    pub fn root_dir(&self) -> PathBuf {
        self.root
            .clone()
            .unwrap_or_else(super::ConfigManager::default_cache_root)
    }

    /// Fetch options derived from this config
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.http_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[cache]"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.default_depth, DEFAULT_DEPTH);
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [cache]
            root = "/var/cache/data"
            enabled = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.root_dir(), PathBuf::from("/var/cache/data"));
        assert!(!config.cache.enabled);
        assert_eq!(config.cache.http_timeout_secs, 60); // default preserved
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn fetch_options_from_config() {
        let config = CacheConfig {
            http_timeout_secs: 5,
            ..CacheConfig::default()
        };
        assert_eq!(config.fetch_options().timeout, Duration::from_secs(5));
    }
}
