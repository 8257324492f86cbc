//! Backup and restore orchestration.
//!
//! The pipeline wires the scanner, the copier, the file cipher, and an
//! optional storage backend into one sequential run: scan, classify and
//! copy, encrypt what was written, upload. Dry runs stop after the copy
//! decisions and mutate nothing; they also never require the encryption
//! key. All state for one run (progress tracker, counts) is created fresh
//! per invocation and discarded at the end.

use crate::copier;
use crate::crypto::FileCipher;
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::scanner::Scanner;
use crate::storage::{remote_key_for, StorageBackend};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Result of a real backup run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CopyResult {
    /// Files whose content was written: new + versioned
    pub copied: usize,
    /// Files left untouched as unchanged
    pub skipped: usize,
    /// Prior versions preserved under timestamped names
    pub versions_created: usize,
    /// Files considered by the run
    pub total_files: usize,
}

/// Result of a dry run: the same classification, no mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DryRunResult {
    pub planned_copies: usize,
    pub planned_versions: usize,
    pub planned_skips: usize,
}

/// What a backup run produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BackupOutcome {
    Completed(CopyResult),
    DryRun(DryRunResult),
}

/// Result of a restore run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RestoreSummary {
    pub files_restored: usize,
}

/// Callback receiving progress events during a run
pub type ProgressSink = Box<dyn FnMut(ProgressEvent) + Send>;

/// Orchestrates scan, diff/version, encryption, and transfer
pub struct BackupPipeline {
    scanner: Scanner,
    key: Option<String>,
    storage: Option<Arc<dyn StorageBackend>>,
    progress: Option<ProgressSink>,
}

impl Default for BackupPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupPipeline {
    pub fn new() -> Self {
        Self {
            scanner: Scanner::new(),
            key: None,
            storage: None,
            progress: None,
        }
    }

    /// Supply the encryption passphrase; required for real backup runs and
    /// restores, never evaluated during dry runs
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach a storage backend for remote sync and restore
    pub fn with_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Attach an external progress sink
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    /// Back up `source` into `destination`.
    ///
    /// Dry runs return [`BackupOutcome::DryRun`] right after the copy
    /// decision pass; real runs encrypt the files written this run, upload
    /// the destination tree when a storage backend is configured, and
    /// return [`BackupOutcome::Completed`].
    pub async fn run_backup(
        &mut self,
        source: &Path,
        destination: &Path,
        dry_run: bool,
    ) -> Result<BackupOutcome> {
        // Resolve the cipher up front so a missing key fails before any
        // mutation; dry runs never need it
        let cipher = if dry_run {
            None
        } else {
            let key = self.key.as_deref().ok_or_else(|| {
                Error::configuration("encryption key is required for a real backup run")
            })?;
            Some(FileCipher::from_passphrase(key)?)
        };

        let total = self.scanner.count(source)?;
        info!(
            "Backing up {} -> {} ({} files{})",
            source.display(),
            destination.display(),
            total,
            if dry_run { ", dry run" } else { "" }
        );

        let mut tracker = ProgressTracker::new(total);
        let scanner = self.scanner.clone();
        let sink = &mut self.progress;
        let scan_result = scanner.scan_with_progress(source, |_| {
            let event = tracker.advance();
            if tracker.percent_changed() {
                info!(
                    "Scan progress: {}% ({}/{})",
                    event.percent, event.processed, event.total
                );
            }
            if let Some(on_progress) = sink.as_mut() {
                on_progress(event);
            }
        })?;

        if scan_result.skipped > 0 {
            warn!("{} files skipped due to access errors", scan_result.skipped);
        }

        let stats = copier::copy_with_versions(&scan_result.files, destination, dry_run)?;

        if dry_run {
            info!("Dry run complete; encryption and upload skipped");
            return Ok(BackupOutcome::DryRun(DryRunResult {
                planned_copies: stats.copied,
                planned_versions: stats.versions_created,
                planned_skips: stats.skipped,
            }));
        }

        let cipher = cipher
            .ok_or_else(|| Error::configuration("encryption key is required for a real backup run"))?;

        // Encrypt only what this run wrote; previously encrypted files in
        // the destination keep their existing wrapping
        info!("Encrypting {} backup files", stats.written.len());
        for path in &stats.written {
            debug!("Encrypting {}", path.display());
            cipher.encrypt_file(path)?;
        }

        if let Some(storage) = &self.storage {
            self.upload_tree(storage.as_ref(), destination).await?;
        }

        Ok(BackupOutcome::Completed(CopyResult {
            copied: stats.copied,
            skipped: stats.skipped,
            versions_created: stats.versions_created,
            total_files: total,
        }))
    }

    /// Upload every regular file in the destination tree under its
    /// destination-relative key
    async fn upload_tree(&self, storage: &dyn StorageBackend, destination: &Path) -> Result<()> {
        let mut uploaded = 0usize;
        for entry in WalkDir::new(destination).follow_links(false) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let key = remote_key_for(destination, entry.path())?;
            storage.upload(entry.path(), &key).await?;
            uploaded += 1;
        }
        info!("Uploaded {} files", uploaded);
        Ok(())
    }

    /// Restore all remote objects under `prefix` into `destination`,
    /// decrypting each file in place after download
    pub async fn run_restore(&mut self, destination: &Path, prefix: &str) -> Result<RestoreSummary> {
        let key = self.key.as_deref().ok_or_else(|| {
            Error::configuration("encryption key is required for restore")
        })?;
        let cipher = FileCipher::from_passphrase(key)?;
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| Error::configuration("no storage backend configured for restore"))?;

        let keys = storage.list(prefix).await?;
        info!(
            "Restoring {} objects under prefix '{}' to {}",
            keys.len(),
            prefix,
            destination.display()
        );

        for remote_key in &keys {
            let local_path = destination.join(remote_key);
            debug!("Downloading {}", remote_key);
            storage.download(remote_key, &local_path).await?;
            debug!("Decrypting {}", local_path.display());
            cipher.decrypt_file(&local_path)?;
        }

        info!("Restore completed");
        Ok(RestoreSummary {
            files_restored: keys.len(),
        })
    }
}
