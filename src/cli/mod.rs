//! Command-line interface for chronovault.

use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::PathBuf;

pub mod backup;
pub mod restore;

/// chronovault - incremental versioned backups with encryption at rest
#[derive(Parser)]
#[command(name = "chronovault")]
#[command(about = "Incremental versioned backup tool with encryption at rest and S3 sync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Back up a source directory into a versioned destination tree
    Backup(backup::BackupArgs),
    /// Restore remote objects into a local directory
    Restore(restore::RestoreArgs),
}

/// Prompt on stdin until the user supplies an existing directory
pub(crate) fn prompt_for_directory(what: &str) -> io::Result<PathBuf> {
    loop {
        print!("Please enter the path of the {what} folder: ");
        io::stdout().flush()?;

        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        let path = PathBuf::from(line.trim());

        if path.is_dir() {
            println!("Selected folder: {}", path.display());
            return Ok(path);
        }
        println!("Not a folder, please enter a path to an existing folder.\n");
    }
}
