//! Load command - materialize a source and print its local paths

use crate::cache::caching_enabled;
use crate::cli::args::SourceArgs;
use crate::config::Config;
use crate::error::SourceCacheResult;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the load command
pub async fn execute(args: SourceArgs, config: &Config) -> SourceCacheResult<()> {
    let ctx = UiContext::detect();
    let source = super::open_source(&args, config).await?;

    if source.caches().is_empty() {
        ui::step_info(&ctx, &format!("Source {} declares no caches", source.name()));
        return Ok(());
    }

    if !caching_enabled() {
        ui::step_warn_hint(
            &ctx,
            "Caching disabled, returning locators unchanged",
            "Unset SOURCECACHE_DISABLE or cache.enabled = false",
        );
    }

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Loading {}", source.name()));

    let outcomes = match source.load_all().await {
        Ok(outcomes) => outcomes,
        Err(e) => {
            spinner.stop_error(&format!("Failed to load {}", source.name()));
            return Err(e);
        }
    };

    let files: usize = outcomes.iter().map(|o| o.paths.len()).sum();
    spinner.stop(&format!("Loaded {} ({} file(s))", source.name(), files));

    for outcome in &outcomes {
        ui::step_ok_detail(
            &ctx,
            &outcome.locator,
            &outcome.cache_dir.display().to_string(),
        );
        for path in &outcome.paths {
            ui::remark(&ctx, &path.display().to_string());
        }
    }

    Ok(())
}
