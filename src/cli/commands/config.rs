//! Config command - show configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::Config;
use crate::error::SourceCacheResult;
use std::path::Path;

/// Execute the config command
pub async fn execute(args: ConfigArgs, config: &Config, path: &Path) -> SourceCacheResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", path.display()),
    }
    Ok(())
}

fn show_config(config: &Config) -> SourceCacheResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    println!(
        "# effective cache root: {}",
        config.cache.root_dir().display()
    );
    Ok(())
}

