//! Discover command - infer schemas and print the catalog

use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use tap_sftp::{discover_streams, Catalog};
use tracing::info;

/// Arguments for the discover command
#[derive(Debug)]
pub struct DiscoverArgs {
    pub config: PathBuf,
    pub output: Option<PathBuf>,
}

pub fn run(args: DiscoverArgs) -> anyhow::Result<()> {
    let config = super::load_config(&args.config)?;
    info!(host = %config.host, tables = config.tables.len(), "starting discovery");

    let streams = discover_streams(&config).context("Discovery failed")?;
    let catalog = Catalog { streams };
    let json = serde_json::to_string_pretty(&catalog)?;

    match args.output {
        Some(path) => {
            fs::write(&path, format!("{}\n", json))
                .with_context(|| format!("Failed to write catalog to {}", path.display()))?;
            info!(path = %path.display(), "catalog written");
        }
        None => println!("{}", json),
    }

    Ok(())
}
