//! Metadata command - show recorded cache entries for a source

use crate::cache::CacheMetadata;
use crate::cli::args::{MetadataArgs, OutputFormat};
use crate::config::Config;
use crate::error::SourceCacheResult;
use crate::ui::{self, UiContext};
use console::style;

/// Execute the metadata command
pub async fn execute(args: MetadataArgs, config: &Config) -> SourceCacheResult<()> {
    let source = super::open_source(&args.target, config).await?;
    let records = source.metadata().await;

    if records.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("Nothing cached for {}", source.name()));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(source.name(), &records),
        OutputFormat::Json => print_json(&records)?,
        OutputFormat::Plain => print_plain(&records),
    }

    Ok(())
}

fn print_table(name: &str, records: &[CacheMetadata]) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Cache entries for {}", name));

    println!(
        "{:<17} {:<40} {}",
        style("CREATED").bold(),
        style("ORIGINAL").bold(),
        style("CACHED").bold()
    );
    println!("{}", "-".repeat(100));

    for record in records {
        println!(
            "{:<17} {:<40} {}",
            record.created.format("%Y-%m-%d %H:%M"),
            record.original_path,
            record.cache_path.display()
        );
    }

    println!();
    println!("{} entr{}", records.len(), if records.len() == 1 { "y" } else { "ies" });
}

fn print_json(records: &[CacheMetadata]) -> SourceCacheResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(records: &[CacheMetadata]) {
    for record in records {
        println!("{}", record.cache_path.display());
    }
}
