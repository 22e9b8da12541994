//! Files command - show which remote files each table would sample

use anyhow::Context;
use serde::Serialize;
use std::path::PathBuf;
use tap_sftp::{matching_files, SftpConnection};

use super::output::{format_timestamp, print_table};

/// Arguments for the files command
#[derive(Debug)]
pub struct FilesArgs {
    pub config: PathBuf,
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct TableFiles {
    table_name: String,
    search_prefix: String,
    files: Vec<FileEntry>,
}

#[derive(Debug, Serialize)]
struct FileEntry {
    filepath: String,
    last_modified: String,
    /// The file discovery would sample
    newest: bool,
}

pub fn run(args: FilesArgs) -> anyhow::Result<()> {
    let config = super::load_config(&args.config)?;
    let client = SftpConnection::connect(&config)
        .with_context(|| format!("Failed to connect to {}", config.host))?;

    let mut tables = Vec::with_capacity(config.tables.len());
    for table in &config.tables {
        let mut files = matching_files(&client, table)
            .with_context(|| format!("Failed to list files for table '{}'", table.table_name))?;
        files.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| b.filepath.cmp(&a.filepath))
        });

        tables.push(TableFiles {
            table_name: table.table_name.clone(),
            search_prefix: table.search_prefix.clone(),
            files: files
                .into_iter()
                .enumerate()
                .map(|(idx, f)| FileEntry {
                    filepath: f.filepath,
                    last_modified: f.last_modified.to_rfc3339(),
                    newest: idx == 0,
                })
                .collect(),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tables)?);
        return Ok(());
    }

    for table in &tables {
        println!("{} ({})", table.table_name, table.search_prefix);
        if table.files.is_empty() {
            println!("  (no matching files)");
            println!();
            continue;
        }
        let rows = table
            .files
            .iter()
            .map(|f| {
                vec![
                    f.filepath.clone(),
                    format_timestamp(&f.last_modified),
                    if f.newest { "*" } else { "" }.to_string(),
                ]
            })
            .collect();
        print_table(&["File", "Last Modified", "Sampled"], rows);
        println!();
    }

    Ok(())
}
