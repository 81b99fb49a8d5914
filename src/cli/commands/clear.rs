//! Clear command - remove cached content for a source

use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::SourceCacheResult;
use crate::ui::{self, UiContext};

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> SourceCacheResult<()> {
    let ctx = UiContext::detect();
    let source = super::open_source(&args.target, config).await?;

    if args.all {
        source.clear_all().await?;
        for cache in source.caches() {
            ui::step_ok_detail(
                &ctx,
                "Removed cache directory",
                &cache.manager.cache_dir().display().to_string(),
            );
        }
    } else {
        let before = source.metadata().await.len();
        source.clear().await?;
        let noun = if before == 1 { "entry" } else { "entries" };
        ui::step_ok(
            &ctx,
            &format!("Cleared {} {} for {}", before, noun, source.name()),
        );
    }

    Ok(())
}
