//! In-memory blob store.
//!
//! Used for local runs without object storage credentials and as the blob
//! store double in pipeline tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{StorageError, StorageResult};
use crate::store::{BlobStore, LocalWriter};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Vec<u8>,
    public: bool,
}

/// Blob store keeping objects in a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    objects: RwLock<HashMap<(String, String), StoredObject>>,
    fail_uploads: AtomicBool,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an object directly (private ACL).
    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                (bucket.to_string(), key.to_string()),
                StoredObject {
                    data: data.into(),
                    public: false,
                },
            );
    }

    /// Object bytes, if present.
    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    /// True if the object exists and was stored with a public-read ACL.
    pub fn is_public(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.public)
            .unwrap_or(false)
    }

    /// Make every subsequent upload fail.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        dest: &mut LocalWriter,
    ) -> StorageResult<u64> {
        let data = self
            .object(bucket, key)
            .ok_or_else(|| StorageError::not_found(format!("{}/{}", bucket, key)))?;

        dest.write_all(&data).await?;
        dest.flush().await?;
        Ok(data.len() as u64)
    }

    async fn put_public_object(
        &self,
        bucket: &str,
        key: &str,
        mut source: File,
    ) -> StorageResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::upload_failed(format!(
                "upload of {}/{} rejected",
                bucket, key
            )));
        }

        let mut data = Vec::new();
        source.read_to_end(&mut data).await?;

        self.objects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                (bucket.to_string(), key.to_string()),
                StoredObject { data, public: true },
            );
        Ok(())
    }

    async fn check_connectivity(&self, _bucket: &str) -> StorageResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_get_missing_object_is_not_found() {
        let store = InMemoryBlobStore::new();
        let mut sink: Vec<u8> = Vec::new();

        let err = store.get_object("raw", "nope.mp4", &mut sink).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_get_streams_bytes() {
        let store = InMemoryBlobStore::new();
        store.insert("raw", "a.mp4", b"video".to_vec());
        let mut sink: Vec<u8> = Vec::new();

        let n = store.get_object("raw", "a.mp4", &mut sink).await.unwrap();
        assert_eq!(n, 5);
        assert_eq!(sink, b"video");
    }

    #[tokio::test]
    async fn test_upload_is_public() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        tokio::fs::write(&path, b"encoded").await.unwrap();

        let store = InMemoryBlobStore::new();
        let file = File::open(&path).await.unwrap();
        store.put_public_object("processed", "out.mp4", file).await.unwrap();

        assert_eq!(store.object("processed", "out.mp4").unwrap(), b"encoded");
        assert!(store.is_public("processed", "out.mp4"));
    }

    #[tokio::test]
    async fn test_upload_failure_injection() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.mp4");
        tokio::fs::write(&path, b"encoded").await.unwrap();

        let store = InMemoryBlobStore::new();
        store.set_fail_uploads(true);
        let file = File::open(&path).await.unwrap();

        let err = store
            .put_public_object("processed", "out.mp4", file)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
        assert!(store.object("processed", "out.mp4").is_none());
    }
}
