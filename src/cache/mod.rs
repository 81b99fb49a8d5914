//! Content-addressed local cache for data sources
//!
//! Given a source locator (path, glob or URL), guarantees a usable local copy
//! exists: fetched on first use, reused afterwards.
//!
//! # Layout
//!
//! ```text
//! <cache_dir>/
//!   cache_metadata.json      locator -> [CacheEntry]
//!   cache_metadata.lock      advisory lock for metadata writes
//!   <md5(locator)>/...       materialized content, one directory per entry
//! ```
//!
//! # Staleness
//!
//! | State | `load` does |
//! |-------|-------------|
//! | Recorded, files present | return recorded paths, touch nothing |
//! | Recorded, a file missing | materialize again at the same paths |
//! | Not recorded | materialize, record, return |
//! | Caching disabled | return the locator unchanged |
//!
//! There is no time-based expiry: `clear_cache` / `clear_all` are the only
//! other ways to force a refresh.

pub mod backend;
pub mod fetch;
pub mod hasher;
pub mod manager;
pub mod metadata;
pub mod switch;

pub use backend::{CacheBackend, Compression, MaterializeRequest, DEFAULT_DEPTH};
pub use fetch::{FetchOptions, SourceLocation};
pub use hasher::entry_id;
pub use manager::{CacheManager, CacheMetadata};
pub use metadata::{CacheEntry, MetadataStore, METADATA_FILENAME};
pub use switch::{caching_enabled, set_caching_enabled, CachingSwitch};
