//! sourcecache - local disk cache for data sources
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use sourcecache::cache::set_caching_enabled;
use sourcecache::cli::{Cli, Commands};
use sourcecache::config::{Config, ConfigManager};
use sourcecache::error::SourceCacheResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> SourceCacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    if cli.no_cache || !config.cache.enabled {
        debug!("Caching disabled");
        set_caching_enabled(false);
    }

    match cli.command {
        Commands::Load(args) => sourcecache::cli::commands::load(args, &config).await,
        Commands::Metadata(args) => sourcecache::cli::commands::metadata(args, &config).await,
        Commands::Clear(args) => sourcecache::cli::commands::clear(args, &config).await,
        Commands::Sources(args) => sourcecache::cli::commands::sources(args, &config).await,
        Commands::Config(args) => {
            sourcecache::cli::commands::config(args, &config, config_manager.path()).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.verbose` raises the floor to info
fn init_logging(verbose: u8, config: &Config) {
    let level = if config.general.verbose {
        verbose.max(1)
    } else {
        verbose
    };
    let filter = match level {
        0 => EnvFilter::new("sourcecache=warn"),
        1 => EnvFilter::new("sourcecache=info"),
        _ => EnvFilter::new("sourcecache=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .without_time()
            .with_writer(std::io::stderr)
            .init();
    }
}
