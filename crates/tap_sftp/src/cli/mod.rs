//! CLI commands for tap-sftp

pub mod discover;
pub mod files;
pub mod output;

use anyhow::Context;
use std::path::Path;
use tap_sftp::Config;

/// Load and validate the config file named on the command line.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))
}
