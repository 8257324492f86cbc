//! chronovault - incremental versioned backups with encryption at rest
//!
//! Main binary entry point for the command-line interface.

use anyhow::Result;
use chronovault::cli::{Cli, Commands};
use chronovault::logging;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose)?;

    match cli.command {
        Commands::Backup(args) => chronovault::cli::backup::run(args).await?,
        Commands::Restore(args) => chronovault::cli::restore::run(args).await?,
    }

    Ok(())
}
