//! tap-sftp command-line entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tap_sftp_logging::{init_logging, LogConfig};
use tracing::error;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "tap-sftp", about = "Discover schemas of delimited files on SFTP hosts")]
struct Cli {
    /// Enable verbose logging (debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Do not keep a rolling log file
    #[arg(long, global = true)]
    no_log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover stream schemas and print the catalog as JSON
    Discover {
        /// Tap config file
        #[arg(short, long, env = "TAP_SFTP_CONFIG")]
        config: PathBuf,

        /// Write the catalog here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List each table's candidate files, newest first
    Files {
        /// Tap config file
        #[arg(short, long, env = "TAP_SFTP_CONFIG")]
        config: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::new("tap-sftp");
    log_config.verbose = cli.verbose;
    log_config.file_logging = !cli.no_log_file;
    if let Err(err) = init_logging(log_config) {
        eprintln!("Warning: failed to initialize logging: {:#}", err);
    }

    let result = match cli.command {
        Commands::Discover { config, output } => {
            cli::discover::run(cli::discover::DiscoverArgs { config, output })
        }
        Commands::Files { config, json } => cli::files::run(cli::files::FilesArgs { config, json }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
