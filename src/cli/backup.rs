//! Backup command implementation.

use crate::config::{self, S3Settings};
use crate::pipeline::{BackupOutcome, BackupPipeline};
use crate::storage::S3Storage;
use crate::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the backup command
#[derive(Args)]
pub struct BackupArgs {
    /// Source directory to back up (prompted for when omitted)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Destination directory for the versioned backup tree
    #[arg(short, long)]
    pub destination: PathBuf,

    /// Compute and report decisions without mutating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Upload the destination tree to S3 after the backup
    #[arg(long)]
    pub sync: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the backup command
pub async fn run(args: BackupArgs) -> Result<()> {
    let source = match args.source {
        Some(source) => source,
        None => super::prompt_for_directory("source")?,
    };

    let mut pipeline = BackupPipeline::new();

    // The key is only read from the environment when the run will actually
    // encrypt something
    if !args.dry_run {
        pipeline = pipeline.with_key(config::encryption_key_from_env()?);
    }

    if args.sync && !args.dry_run {
        let settings = S3Settings::from_env()?;
        let storage = S3Storage::connect(&settings).await?;
        pipeline = pipeline.with_storage(Arc::new(storage));
    }

    let outcome = pipeline
        .run_backup(&source, &args.destination, args.dry_run)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        BackupOutcome::Completed(result) => {
            println!("Backup completed successfully!");
            println!("  Files considered: {}", result.total_files);
            println!("  Copied: {}", result.copied);
            println!("  Versions created: {}", result.versions_created);
            println!("  Unchanged: {}", result.skipped);
        }
        BackupOutcome::DryRun(result) => {
            println!("Dry run - no changes were made");
            println!("  Planned copies: {}", result.planned_copies);
            println!("  Planned versions: {}", result.planned_versions);
            println!("  Planned skips: {}", result.planned_skips);
        }
    }

    Ok(())
}
