//! sourcecache - local disk cache for data sources
//!
//! Turns source locators (local paths, globs, http(s) URLs, archives) into
//! local files kept in content-addressed cache directories, with a JSON
//! metadata store tracking what was materialized from where.

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod ui;

pub use error::{SourceCacheError, SourceCacheResult};
