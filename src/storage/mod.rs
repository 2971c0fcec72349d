//! Object storage clients the runtime config file is fetched from.

pub mod filesystem;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{Backend, StorageConfig};
use crate::error::BucketError;

pub use filesystem::FilesystemBucket;
pub use memory::MemoryBucket;

/// Read access to a named object in a storage backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Returns the full contents of the object at `path`.
    async fn get(&self, path: &str) -> Result<Vec<u8>, BucketError>;
}

/// Creates the bucket client once the manager starts.
pub type BucketClientFactory = Arc<dyn Fn() -> Result<Arc<dyn Bucket>, BucketError> + Send + Sync>;

/// Builds a bucket client for the configured backend.
pub fn new_bucket_client(storage: &StorageConfig) -> Result<Arc<dyn Bucket>, BucketError> {
    match storage.backend {
        Backend::Filesystem => Ok(Arc::new(FilesystemBucket::new(&storage.filesystem.dir)?)),
    }
}

/// Returns a factory that builds a client from `storage` when invoked.
pub fn bucket_client_factory(storage: StorageConfig) -> BucketClientFactory {
    Arc::new(move || new_bucket_client(&storage))
}

/// Returns a factory that always hands out the given client.
pub fn static_bucket_factory(bucket: Arc<dyn Bucket>) -> BucketClientFactory {
    Arc::new(move || -> Result<Arc<dyn Bucket>, BucketError> { Ok(Arc::clone(&bucket)) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilesystemConfig;

    #[tokio::test]
    async fn filesystem_backend_reads_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("overrides.yaml"), b"a: 1").unwrap();

        let storage = StorageConfig {
            backend: Backend::Filesystem,
            filesystem: FilesystemConfig {
                dir: dir.path().to_path_buf(),
            },
        };

        let factory = bucket_client_factory(storage);
        let bucket = factory().unwrap();
        assert_eq!(bucket.name(), "filesystem");
        assert_eq!(bucket.get("overrides.yaml").await.unwrap(), b"a: 1");
    }

    #[tokio::test]
    async fn static_factory_shares_one_client() {
        let memory = MemoryBucket::new();
        let factory = static_bucket_factory(Arc::new(memory.clone()));

        let bucket = factory().unwrap();
        assert_eq!(bucket.name(), "memory");
        memory.upload("cfg.yaml", b"x".to_vec());
        assert_eq!(bucket.get("cfg.yaml").await.unwrap(), b"x");
    }

    #[test]
    fn missing_filesystem_dir_fails_when_the_factory_runs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = StorageConfig {
            backend: Backend::Filesystem,
            filesystem: FilesystemConfig {
                dir: dir.path().join("absent"),
            },
        };

        let factory = bucket_client_factory(storage);
        assert!(matches!(factory(), Err(BucketError::Unavailable(_))));
    }
}
