//! Copy decisions and file versioning.
//!
//! For every scanned file the copier decides whether it is new, unchanged,
//! or modified relative to the backup destination, then applies that
//! decision unless the run is a dry run. Classification and application are
//! deliberately separate so a dry run and the real run that follows it are
//! guaranteed to agree.
//!
//! A modified file never overwrites prior content: the existing destination
//! file is renamed to a timestamped sibling before the new bytes land, so a
//! crash between the two steps can duplicate old content but never lose it.

use crate::scanner::FileDescriptor;
use crate::{crypto, Result};
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Per-file classification against the destination tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDecision {
    /// No destination file exists yet
    New,
    /// Destination matches on size and truncated-to-second mtime
    Unchanged,
    /// Destination exists but differs; its content must be preserved
    Versioned,
}

/// Aggregated result of one copy pass
#[derive(Debug, Default)]
pub struct CopyStats {
    /// Files whose content was (or would be) written: new + versioned
    pub copied: usize,
    /// Files left untouched because they were unchanged
    pub skipped: usize,
    /// Files whose prior destination content was (or would be) versioned
    pub versions_created: usize,
    /// Destination paths actually written this run; empty for dry runs
    pub written: Vec<PathBuf>,
}

/// Classify a source file against the destination tree without mutating
/// anything.
///
/// The comparison uses the destination file's plaintext-equivalent size
/// (see [`crypto::effective_len`]) so a destination encrypted at rest still
/// classifies as unchanged when the source has not moved.
pub fn classify(descriptor: &FileDescriptor, destination_root: &Path) -> Result<CopyDecision> {
    let dst_path = destination_root.join(&descriptor.relative_path);

    if !dst_path.exists() {
        return Ok(CopyDecision::New);
    }

    let metadata = fs::metadata(&dst_path)?;
    let same_size = crypto::effective_len(&dst_path)? == descriptor.size;
    let same_mtime = unix_seconds(metadata.modified()?) == unix_seconds(descriptor.modified);

    if same_size && same_mtime {
        Ok(CopyDecision::Unchanged)
    } else {
        Ok(CopyDecision::Versioned)
    }
}

/// Apply copy decisions for every file in the manifest.
///
/// With `dry_run` set, decisions are computed identically but no filesystem
/// mutation of any kind takes place.
pub fn copy_with_versions(
    files: &[FileDescriptor],
    destination_root: &Path,
    dry_run: bool,
) -> Result<CopyStats> {
    let mut stats = CopyStats::default();

    for descriptor in files {
        let dst_path = destination_root.join(&descriptor.relative_path);

        match classify(descriptor, destination_root)? {
            CopyDecision::New => {
                debug!("New file: {}", descriptor.relative_path.display());
                if !dry_run {
                    copy_preserving(&descriptor.path, &dst_path, descriptor.modified)?;
                    stats.written.push(dst_path);
                }
                stats.copied += 1;
            }
            CopyDecision::Unchanged => {
                debug!("Unchanged: {}", descriptor.relative_path.display());
                stats.skipped += 1;
            }
            CopyDecision::Versioned => {
                if !dry_run {
                    let versioned = versioned_path(&dst_path, Local::now());
                    info!(
                        "Versioning {} -> {}",
                        descriptor.relative_path.display(),
                        versioned.display()
                    );
                    // Preserve the old content before the new content lands
                    fs::rename(&dst_path, &versioned)?;
                    copy_preserving(&descriptor.path, &dst_path, descriptor.modified)?;
                    stats.written.push(dst_path);
                }
                stats.copied += 1;
                stats.versions_created += 1;
            }
        }
    }

    Ok(stats)
}

/// Copy `src` to `dst`, creating parent directories and carrying over the
/// source modification time
fn copy_preserving(src: &Path, dst: &Path, modified: SystemTime) -> Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(src, dst)?;
    fs::File::options()
        .write(true)
        .open(dst)?
        .set_modified(modified)?;
    Ok(())
}

/// Derive the versioned sibling name for a destination file.
///
/// Inserts a second-resolution timestamp between stem and extension; if that
/// name is already taken (two versions within the same second), appends a
/// counter until a free name is found.
fn versioned_path(dst_path: &Path, timestamp: DateTime<Local>) -> PathBuf {
    let stem = dst_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = dst_path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    let parent = dst_path.parent().unwrap_or_else(|| Path::new(""));
    let base = format!("{stem}__{}", timestamp.format("%Y%m%d_%H%M%S"));

    let mut candidate = parent.join(format!("{base}{extension}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = parent.join(format!("{base}_{counter}{extension}"));
        counter += 1;
    }
    candidate
}

fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
