//! Bucket backed by a local directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::Bucket;
use crate::error::BucketError;

/// Resolves object paths against a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemBucket {
    root: PathBuf,
}

impl FilesystemBucket {
    /// Creates a bucket rooted at `dir`. The directory must exist.
    pub fn new(dir: &Path) -> Result<Self, BucketError> {
        if !dir.is_dir() {
            return Err(BucketError::Unavailable(format!(
                "'{}' is not a directory",
                dir.display()
            )));
        }

        Ok(Self {
            root: dir.to_path_buf(),
        })
    }

    /// Returns the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Bucket for FilesystemBucket {
    fn name(&self) -> &str {
        "filesystem"
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, BucketError> {
        let full_path = self.root.join(path);

        tokio::fs::read(&full_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => BucketError::NotFound {
                path: path.to_string(),
            },
            _ => BucketError::Io {
                path: path.to_string(),
                source: e,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_nested_objects() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("tenants")).unwrap();
        std::fs::write(dir.path().join("tenants/limits.yaml"), b"limit: 5").unwrap();

        let bucket = FilesystemBucket::new(dir.path()).unwrap();
        let bytes = bucket.get("tenants/limits.yaml").await.unwrap();
        assert_eq!(bytes, b"limit: 5");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let bucket = FilesystemBucket::new(dir.path()).unwrap();

        let err = bucket.get("absent.yaml").await.unwrap_err();
        assert!(matches!(err, BucketError::NotFound { ref path } if path == "absent.yaml"));
    }

    #[tokio::test]
    async fn reading_a_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        let bucket = FilesystemBucket::new(dir.path()).unwrap();

        let err = bucket.get("sub").await.unwrap_err();
        assert!(matches!(err, BucketError::Io { .. }));
    }

    #[test]
    fn root_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        assert!(matches!(
            FilesystemBucket::new(&missing),
            Err(BucketError::Unavailable(_))
        ));
    }
}
