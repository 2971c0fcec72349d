//! In-process bucket.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::Bucket;
use crate::error::BucketError;

/// Objects held in memory. Clones share the same object map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBucket {
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `content` under `path`, replacing any previous object.
    pub fn upload(&self, path: &str, content: impl Into<Vec<u8>>) {
        self.objects.write().insert(path.to_string(), content.into());
    }

    /// Removes the object at `path`. Returns whether it existed.
    pub fn delete(&self, path: &str) -> bool {
        self.objects.write().remove(path).is_some()
    }
}

#[async_trait]
impl Bucket for MemoryBucket {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>, BucketError> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| BucketError::NotFound {
                path: path.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_replace_delete() {
        let bucket = MemoryBucket::new();
        assert!(bucket.get("cfg.yaml").await.is_err());

        bucket.upload("cfg.yaml", "a: 1");
        assert_eq!(bucket.get("cfg.yaml").await.unwrap(), b"a: 1");

        bucket.upload("cfg.yaml", "a: 2");
        assert_eq!(bucket.get("cfg.yaml").await.unwrap(), b"a: 2");

        assert!(bucket.delete("cfg.yaml"));
        assert!(!bucket.delete("cfg.yaml"));
        assert!(matches!(
            bucket.get("cfg.yaml").await,
            Err(BucketError::NotFound { .. })
        ));
    }
}
