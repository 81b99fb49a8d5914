//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sourcecache - local disk cache for data sources
///
/// Materializes the files a catalog source points at (paths, globs, URLs,
/// archives) into content-addressed cache directories and reuses them.
#[derive(Parser, Debug)]
#[command(name = "sourcecache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "SOURCECACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Disable caching; loads return locators unchanged
    #[arg(long, global = true, env = "SOURCECACHE_DISABLE")]
    pub no_cache: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a source through its caches and print local paths
    Load(SourceArgs),

    /// Show recorded cache entries for a source
    Metadata(MetadataArgs),

    /// Remove cached content for a source
    Clear(ClearArgs),

    /// List sources in a catalog
    Sources(SourcesArgs),

    /// Show configuration
    Config(ConfigArgs),
}

/// Catalog and source name
#[derive(Parser, Debug)]
pub struct SourceArgs {
    /// Catalog file
    pub catalog: String,

    /// Source name within the catalog
    pub source: String,
}

/// Arguments for the metadata command
#[derive(Parser, Debug)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub target: SourceArgs,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the clear command
#[derive(Parser, Debug)]
pub struct ClearArgs {
    #[command(flatten)]
    pub target: SourceArgs,

    /// Remove the whole cache directory, not just this source's entries
    #[arg(short, long)]
    pub all: bool,
}

/// Arguments for the sources command
#[derive(Parser, Debug)]
pub struct SourcesArgs {
    /// Catalog file
    pub catalog: String,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

/// Output format options
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_clear_all() {
        let cli = Cli::try_parse_from(["sourcecache", "clear", "cat.toml", "flights", "--all"])
            .unwrap();
        match cli.command {
            Commands::Clear(args) => {
                assert!(args.all);
                assert_eq!(args.target.source, "flights");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn no_cache_is_global() {
        let cli =
            Cli::try_parse_from(["sourcecache", "load", "cat.toml", "flights", "--no-cache"])
                .unwrap();
        assert!(cli.no_cache);
    }
}
