//! End-to-end pipeline tests: backup, versioning, dry-run semantics,
//! encryption at rest, and restore through an in-memory storage backend.

use chronovault::crypto::FileCipher;
use chronovault::{
    BackupOutcome, BackupPipeline, CopyResult, DryRunResult, MemoryStorage, ProgressEvent,
    StorageBackend,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tempfile::TempDir;

const KEY: &str = "integration-test-passphrase";

fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn pipeline() -> BackupPipeline {
    BackupPipeline::new().with_key(KEY)
}

fn completed(outcome: BackupOutcome) -> CopyResult {
    match outcome {
        BackupOutcome::Completed(result) => result,
        BackupOutcome::DryRun(_) => panic!("expected a completed run"),
    }
}

fn dry(outcome: BackupOutcome) -> DryRunResult {
    match outcome {
        BackupOutcome::DryRun(result) => result,
        BackupOutcome::Completed(_) => panic!("expected a dry run"),
    }
}

fn decrypted(path: &Path) -> Vec<u8> {
    let copy = path.with_extension("tmp-decrypt");
    fs::copy(path, &copy).unwrap();
    FileCipher::from_passphrase(KEY)
        .unwrap()
        .decrypt_file(&copy)
        .unwrap();
    let data = fs::read(&copy).unwrap();
    fs::remove_file(&copy).unwrap();
    data
}

/// Sorted (relative path, size, mtime) snapshot of a directory tree
fn tree_snapshot(root: &Path) -> Vec<(PathBuf, u64, SystemTime)> {
    let mut entries = Vec::new();
    if !root.exists() {
        return entries;
    }
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let metadata = entry.metadata().unwrap();
            entries.push((
                entry.path().strip_prefix(root).unwrap().to_path_buf(),
                metadata.len(),
                metadata.modified().unwrap(),
            ));
        }
    }
    entries.sort();
    entries
}

#[tokio::test]
async fn backup_then_modify_then_backup_versions_old_content() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("a.txt"), b"12345");
    write_file(&source.join("skip/__pycache__/b.txt"), b"ignored");

    let result = completed(
        pipeline()
            .run_backup(&source, &destination, false)
            .await
            .unwrap(),
    );
    assert_eq!(
        result,
        CopyResult {
            copied: 1,
            skipped: 0,
            versions_created: 0,
            total_files: 1,
        }
    );
    assert!(destination.join("a.txt").exists());
    assert!(!destination.join("skip/__pycache__/b.txt").exists());
    assert_eq!(decrypted(&destination.join("a.txt")), b"12345");

    write_file(&source.join("a.txt"), b"123456789");
    let result = completed(
        pipeline()
            .run_backup(&source, &destination, false)
            .await
            .unwrap(),
    );
    assert_eq!(
        result,
        CopyResult {
            copied: 1,
            skipped: 0,
            versions_created: 1,
            total_files: 1,
        }
    );

    assert_eq!(decrypted(&destination.join("a.txt")), b"123456789");
    let versions: Vec<_> = fs::read_dir(&destination)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy().into_owned();
            name.starts_with("a__") && name.ends_with(".txt")
        })
        .collect();
    assert_eq!(versions.len(), 1);
    assert_eq!(decrypted(&versions[0]), b"12345");
}

#[tokio::test]
async fn rerun_over_unchanged_source_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("a.txt"), b"alpha");
    write_file(&source.join("docs/b.txt"), b"beta");

    pipeline()
        .run_backup(&source, &destination, false)
        .await
        .unwrap();
    let second = completed(
        pipeline()
            .run_backup(&source, &destination, false)
            .await
            .unwrap(),
    );

    assert_eq!(
        second,
        CopyResult {
            copied: 0,
            skipped: 2,
            versions_created: 0,
            total_files: 2,
        }
    );
}

#[tokio::test]
async fn dry_run_matches_the_real_run_that_follows() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("kept.txt"), b"kept");
    write_file(&source.join("changed.txt"), b"before");
    pipeline()
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    write_file(&source.join("changed.txt"), b"after!!");
    write_file(&source.join("brand-new.txt"), b"new");

    let planned = dry(
        pipeline()
            .run_backup(&source, &destination, true)
            .await
            .unwrap(),
    );
    let applied = completed(
        pipeline()
            .run_backup(&source, &destination, false)
            .await
            .unwrap(),
    );

    assert_eq!(planned.planned_copies, applied.copied);
    assert_eq!(planned.planned_versions, applied.versions_created);
    assert_eq!(planned.planned_skips, applied.skipped);
    assert_eq!(applied.copied, 2);
    assert_eq!(applied.versions_created, 1);
    assert_eq!(applied.skipped, 1);
}

#[tokio::test]
async fn dry_run_leaves_the_destination_untouched() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("a.txt"), b"aaa");
    write_file(&source.join("b/c.txt"), b"ccc");
    pipeline()
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    write_file(&source.join("a.txt"), b"changed content");
    write_file(&source.join("fresh.txt"), b"fresh");

    let before = tree_snapshot(&destination);
    pipeline()
        .run_backup(&source, &destination, true)
        .await
        .unwrap();
    let after = tree_snapshot(&destination);

    assert_eq!(before, after);
}

#[tokio::test]
async fn progress_events_are_monotonic_and_forwarded() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    for i in 0..10 {
        write_file(&source.join(format!("f{i}.txt")), b"x");
    }

    let events: Arc<Mutex<Vec<ProgressEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_events = events.clone();
    let mut pipeline = pipeline().with_progress(Box::new(move |event| {
        sink_events.lock().unwrap().push(event);
    }));

    pipeline
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 10);
    for pair in events.windows(2) {
        assert!(pair[1].processed > pair[0].processed);
        assert!(pair[1].percent >= pair[0].percent);
    }
    assert_eq!(events.last().unwrap().percent, 100);
    assert!(events.iter().all(|event| event.total == 10));
}

#[tokio::test]
async fn sync_uploads_destination_tree_and_restore_reverses_it() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("x/y.bin"), b"original bytes");
    write_file(&source.join("top.txt"), b"top-level");

    let storage = Arc::new(MemoryStorage::new());
    let mut backup = pipeline().with_storage(storage.clone() as Arc<dyn StorageBackend>);
    backup
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    let keys = storage.list("").await.unwrap();
    assert_eq!(keys, vec!["top.txt".to_string(), "x/y.bin".to_string()]);

    let out = temp.path().join("out");
    let mut restore = pipeline().with_storage(storage.clone() as Arc<dyn StorageBackend>);
    let summary = restore.run_restore(&out, "x/").await.unwrap();

    assert_eq!(summary.files_restored, 1);
    assert_eq!(fs::read(out.join("x/y.bin")).unwrap(), b"original bytes");
    assert!(!out.join("top.txt").exists());
}

#[tokio::test]
async fn restore_with_wrong_key_fails_loudly() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("a.txt"), b"secret");

    let storage = Arc::new(MemoryStorage::new());
    pipeline()
        .with_storage(storage.clone() as Arc<dyn StorageBackend>)
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    let out = temp.path().join("out");
    let mut restore = BackupPipeline::new()
        .with_key("not-the-key")
        .with_storage(storage as Arc<dyn StorageBackend>);

    assert!(restore.run_restore(&out, "").await.is_err());
}

#[tokio::test]
async fn versioned_files_survive_repeated_sync() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("source");
    let destination = temp.path().join("backup");
    write_file(&source.join("a.txt"), b"v1");

    let storage = Arc::new(MemoryStorage::new());
    pipeline()
        .with_storage(storage.clone() as Arc<dyn StorageBackend>)
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    write_file(&source.join("a.txt"), b"v2 longer");
    pipeline()
        .with_storage(storage.clone() as Arc<dyn StorageBackend>)
        .run_backup(&source, &destination, false)
        .await
        .unwrap();

    // Current content plus one preserved version, both remote
    let keys = storage.list("").await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&"a.txt".to_string()));
    assert!(keys.iter().any(|k| k.starts_with("a__") && k.ends_with(".txt")));
}
