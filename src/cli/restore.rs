//! Restore command implementation.

use crate::config::{self, S3Settings};
use crate::pipeline::BackupPipeline;
use crate::storage::S3Storage;
use crate::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

/// Arguments for the restore command
#[derive(Args)]
pub struct RestoreArgs {
    /// Directory to restore into
    #[arg(short, long)]
    pub destination: PathBuf,

    /// Restrict the restore to remote keys under this prefix
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the restore command
pub async fn run(args: RestoreArgs) -> Result<()> {
    let settings = S3Settings::from_env()?;
    let storage = S3Storage::connect(&settings).await?;

    let mut pipeline = BackupPipeline::new()
        .with_key(config::encryption_key_from_env()?)
        .with_storage(Arc::new(storage));

    let summary = pipeline.run_restore(&args.destination, &args.prefix).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Restore completed successfully!");
        println!("  Files restored: {}", summary.files_restored);
    }

    Ok(())
}
