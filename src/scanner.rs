//! Source tree scanning and manifest construction.
//!
//! The scanner walks a directory tree, filters out well-known cache and
//! metadata directories, and produces an ordered manifest of regular files
//! with the metadata the differ needs (size and modification time). Files
//! that cannot be read (permission denied, vanished mid-scan) are counted
//! as skips and never abort the scan.

use crate::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory and file names excluded from every scan. Matching is by exact
/// path-segment equality at any depth, never by substring.
pub const IGNORE_DIRS: [&str; 6] = [
    "__pycache__",
    ".git",
    ".idea",
    "node_modules",
    "Cache",
    "Temp",
];

/// Metadata for a single regular file discovered by a scan
#[derive(Debug, Clone)]
pub struct FileDescriptor {
    /// Absolute path of the source file
    pub path: PathBuf,
    /// Path relative to the scan root
    pub relative_path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

/// Outcome of scanning a source tree
#[derive(Debug)]
pub struct ScanResult {
    /// Files found, sorted by relative path
    pub files: Vec<FileDescriptor>,
    /// Sum of all file sizes in bytes
    pub total_size: u64,
    /// Files excluded because their metadata could not be read
    pub skipped: usize,
}

/// Recursive directory scanner with a fixed ignore-set
#[derive(Debug, Clone)]
pub struct Scanner {
    ignored: Vec<String>,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    /// Create a scanner with the default ignore-set
    pub fn new() -> Self {
        Self {
            ignored: IGNORE_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn is_ignored(&self, name: &std::ffi::OsStr) -> bool {
        let name = name.to_string_lossy();
        self.ignored.iter().any(|ignored| ignored.as_str() == name)
    }

    fn walk(&self, root: &Path) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
        let scanner = self.clone();
        WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| !scanner.is_ignored(entry.file_name()))
    }

    /// Scan the tree rooted at `root`
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        self.scan_with_progress(root, |_| {})
    }

    /// Scan the tree rooted at `root`, invoking `on_progress` with a
    /// monotonically increasing processed-count after each candidate file
    pub fn scan_with_progress(
        &self,
        root: &Path,
        mut on_progress: impl FnMut(usize),
    ) -> Result<ScanResult> {
        let mut files = Vec::new();
        let mut total_size = 0u64;
        let mut skipped = 0usize;
        let mut processed = 0usize;

        for entry in self.walk(root) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping entry due to error: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            processed += 1;
            on_progress(processed);

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", entry.path().display(), e);
                    skipped += 1;
                    continue;
                }
            };

            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(
                        "Skipping file without mtime {}: {}",
                        entry.path().display(),
                        e
                    );
                    skipped += 1;
                    continue;
                }
            };

            let relative_path = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();

            total_size += metadata.len();
            files.push(FileDescriptor {
                path: entry.path().to_path_buf(),
                relative_path,
                size: metadata.len(),
                modified,
            });
        }

        // Sorted so two scans of the same tree produce the same manifest
        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

        debug!(
            "Scan of {} found {} files ({} bytes, {} skipped)",
            root.display(),
            files.len(),
            total_size,
            skipped
        );

        Ok(ScanResult {
            files,
            total_size,
            skipped,
        })
    }

    /// Count candidate files under `root` without reading their metadata.
    ///
    /// Uses the same traversal and ignore rules as [`Scanner::scan`], so the
    /// result is a valid denominator for scan progress.
    pub fn count(&self, root: &Path) -> Result<usize> {
        let mut count = 0usize;
        for entry in self.walk(root) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => count += 1,
                _ => {}
            }
        }
        Ok(count)
    }
}
