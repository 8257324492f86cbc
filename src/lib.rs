//! # chronovault
//!
//! Incremental, versioned, encrypted backup pipeline.
//!
//! ## Features
//!
//! - **Scanner**: recursive source-tree scanning with a fixed ignore-set
//!   and progress reporting
//! - **Versioning**: modified files are never overwritten; prior content is
//!   preserved under a timestamped sibling name
//! - **Dry run**: computes the exact decisions a real run would make while
//!   mutating nothing
//! - **Encryption at rest**: authenticated ChaCha20-Poly1305 over every
//!   file written to the backup destination
//! - **Remote sync**: optional upload of the destination tree to any
//!   S3-compatible object store, with a matching restore path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chronovault::BackupPipeline;
//! use std::path::Path;
//!
//! # #[tokio::main]
//! # async fn main() -> chronovault::Result<()> {
//! let mut pipeline = BackupPipeline::new().with_key("passphrase");
//! let outcome = pipeline
//!     .run_backup(Path::new("./documents"), Path::new("./backup"), false)
//!     .await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod copier;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod scanner;
pub mod storage;

// Re-export commonly used types
pub use copier::{CopyDecision, CopyStats};
pub use error::{Error, Result};
pub use pipeline::{BackupOutcome, BackupPipeline, CopyResult, DryRunResult, RestoreSummary};
pub use progress::{ProgressEvent, ProgressTracker};
pub use scanner::{FileDescriptor, ScanResult, Scanner};
pub use storage::{MemoryStorage, S3Storage, StorageBackend};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
