//! webscenario - run recorded browser scenarios against a storefront
//!
//! Executes ordered UI steps (navigate, fill, click, select, screenshot)
//! in a fresh browser session per scenario and writes the screenshots.

use std::path::PathBuf;

use clap::Parser;
use commands::Commands;
use webscenario::common::{config::Config, logging};
use webscenario::{cli, commands};

#[derive(Parser)]
#[command(name = "webscenario", about = "Run recorded browser UI scenarios")]
#[command(version, long_about = None)]
struct Cli {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let log = logging::init_cli(cli.verbose, config.logging.file);
    if let Some(file) = &log.file {
        tracing::debug!("Writing log to {}", file.display());
    }

    if let Err(e) = cli::dispatch(cli.command, config).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
