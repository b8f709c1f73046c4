use crate::prelude::{StorageError, ValidationError};
use crate::telemetry::log::LogManager;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

/// Metadata returned for a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    pub bucket: String,
    pub key: String,
    pub size: u64,
}

/// Binary object bucket accepting named uploads.
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` under `key`; an existing key is a conflict.
    fn put(&self, key: &str, bytes: &[u8]) -> Result<ObjectInfo, StorageError>;
}

/// Bucket kept as a directory tree on the local filesystem.
pub struct FsObjectStore {
    bucket: String,
    root: PathBuf,
    logger: LogManager,
}

impl FsObjectStore {
    /// Opens (creating if needed) `<base>/<bucket>`.
    pub fn open<P: AsRef<Path>>(base: P, bucket: &str) -> Result<Self, StorageError> {
        let root = base.as_ref().join(bucket);
        fs::create_dir_all(&root)?;
        Ok(Self {
            bucket: bucket.to_string(),
            root,
            logger: LogManager::new("storage"),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let only_normal = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if key.is_empty() || !only_normal {
            return Err(ValidationError::InvalidName(key.to_string()).into());
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsObjectStore {
    fn put(&self, key: &str, bytes: &[u8]) -> Result<ObjectInfo, StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StorageError::Conflict(key.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        file.write_all(bytes)?;
        file.sync_all()?;
        self.logger.record(&format!(
            "stored {}/{} ({} bytes)",
            self.bucket,
            key,
            bytes.len()
        ));

        Ok(ObjectInfo {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            size: bytes.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn put_writes_object_under_bucket() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "crowd-videos").unwrap();
        let info = store.put("public/1-a.mp4", b"frames").unwrap();

        assert_eq!(info.size, 6);
        let on_disk = fs::read(dir.path().join("crowd-videos/public/1-a.mp4")).unwrap();
        assert_eq!(on_disk, b"frames");
    }

    #[test]
    fn put_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "crowd-videos").unwrap();
        store.put("public/1-a.mp4", b"one").unwrap();
        let err = store.put("public/1-a.mp4", b"two").unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[test]
    fn put_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "crowd-videos").unwrap();
        assert!(matches!(
            store.put("../outside.mp4", b"x"),
            Err(StorageError::Validation(_))
        ));
        assert!(!dir.path().join("outside.mp4").exists());
    }
}
