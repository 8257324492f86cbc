//! Object storage backends.
//!
//! The pipeline talks to remote storage only through the [`StorageBackend`]
//! capability trait, so the S3 adapter can be swapped for an in-memory fake
//! in tests without touching the runner.

use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use std::sync::Mutex;

pub mod s3;

pub use s3::S3Storage;

/// Minimal capability set required of a remote object store
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Transfer a local file's content to the remote store under `remote_key`
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<()>;

    /// Fetch remote content to a local path, creating parent directories as
    /// needed
    async fn download(&self, remote_key: &str, local_path: &Path) -> Result<()>;

    /// Every remote key sharing `prefix`, complete regardless of backend
    /// pagination
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

/// Remote key for a file inside the backup destination tree: its relative
/// path with forward-slash segment joining
pub fn remote_key_for(destination_root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(destination_root)
        .map_err(|_| Error::configuration(format!(
            "{} is not under destination root {}",
            path.display(),
            destination_root.display()
        )))?;

    let segments: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(segments.join("/"))
}

/// In-memory storage backend for tests and local experimentation
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn upload(&self, local_path: &Path, remote_key: &str) -> Result<()> {
        let data = fs::read(local_path)
            .map_err(|e| Error::storage("upload", remote_key, e))?;
        self.objects
            .lock()
            .unwrap()
            .insert(remote_key.to_string(), data);
        Ok(())
    }

    async fn download(&self, remote_key: &str, local_path: &Path) -> Result<()> {
        let data = self
            .objects
            .lock()
            .unwrap()
            .get(remote_key)
            .cloned()
            .ok_or_else(|| Error::storage("download", remote_key, "no such key"))?;
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(local_path, data)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_remote_key_uses_forward_slashes() {
        let root = Path::new("/backups/current");
        let path = root.join("photos").join("2024").join("a.jpg");
        assert_eq!(
            remote_key_for(root, &path).unwrap(),
            "photos/2024/a.jpg"
        );
    }

    #[test]
    fn test_remote_key_outside_root_is_an_error() {
        assert!(remote_key_for(Path::new("/backups"), Path::new("/etc/passwd")).is_err());
    }

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("file.bin");
        fs::write(&local, b"payload").unwrap();

        let storage = MemoryStorage::new();
        storage.upload(&local, "x/y.bin").await.unwrap();

        let out = temp.path().join("out/x/y.bin");
        storage.download("x/y.bin", &out).await.unwrap();
        assert_eq!(fs::read(&out).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_memory_storage_list_by_prefix() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("file.bin");
        fs::write(&local, b"x").unwrap();

        let storage = MemoryStorage::new();
        storage.upload(&local, "a/one").await.unwrap();
        storage.upload(&local, "a/two").await.unwrap();
        storage.upload(&local, "b/three").await.unwrap();

        let keys = storage.list("a/").await.unwrap();
        assert_eq!(keys, vec!["a/one".to_string(), "a/two".to_string()]);
        assert_eq!(storage.list("").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_memory_storage_missing_key() {
        let storage = MemoryStorage::new();
        let err = storage
            .download("gone", Path::new("/tmp/never"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Storage { operation: "download", .. }));
    }
}
