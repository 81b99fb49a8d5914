//! Sources command - list the sources a catalog declares

use crate::catalog::{Catalog, DataSource};
use crate::cli::args::{OutputFormat, SourcesArgs};
use crate::config::Config;
use crate::error::SourceCacheResult;
use crate::ui::{self, UiContext};
use console::style;
use std::collections::BTreeMap;

/// Execute the sources command
pub async fn execute(args: SourcesArgs, _config: &Config) -> SourceCacheResult<()> {
    let catalog = Catalog::load(&args.catalog).await?;

    if catalog.sources.is_empty() {
        match args.format {
            OutputFormat::Json => println!("{{}}"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, "Catalog declares no sources");
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&catalog.sources),
        OutputFormat::Json => print_json(&catalog.sources)?,
        OutputFormat::Plain => print_plain(&catalog.sources),
    }

    Ok(())
}

fn print_table(sources: &BTreeMap<String, DataSource>) {
    println!(
        "{:<24} {:<12} {:<8} {}",
        style("NAME").bold(),
        style("DRIVER").bold(),
        style("CACHES").bold(),
        style("DESCRIPTION").bold()
    );
    println!("{}", "-".repeat(72));

    for (name, source) in sources {
        let kinds: Vec<&str> = source.cache.iter().map(|c| c.kind.as_str()).collect();
        let caches = if kinds.is_empty() {
            "-".to_string()
        } else {
            kinds.join(",")
        };
        println!(
            "{:<24} {:<12} {:<8} {}",
            name,
            source.driver,
            caches,
            source.description.as_deref().unwrap_or("")
        );
    }

    println!();
    println!("{} source(s)", sources.len());
}

fn print_json(sources: &BTreeMap<String, DataSource>) -> SourceCacheResult<()> {
    let json = serde_json::to_string_pretty(sources)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(sources: &BTreeMap<String, DataSource>) {
    for name in sources.keys() {
        println!("{}", name);
    }
}
