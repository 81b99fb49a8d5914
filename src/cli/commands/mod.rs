//! CLI command implementations

pub mod clear;
pub mod config;
pub mod load;
pub mod metadata;
pub mod sources;

pub use clear::execute as clear;
pub use config::execute as config;
pub use load::execute as load;
pub use metadata::execute as metadata;
pub use sources::execute as sources;

use crate::catalog::{CacheContext, Catalog, OpenedSource};
use crate::cli::args::SourceArgs;
use crate::config::Config;
use crate::error::SourceCacheResult;

/// Load the catalog and open the named source with config-derived caches
async fn open_source(target: &SourceArgs, config: &Config) -> SourceCacheResult<OpenedSource> {
    let catalog = Catalog::load(&target.catalog).await?;
    let ctx = CacheContext::from_config(&config.cache);
    catalog.open(&target.source, &ctx)
}
