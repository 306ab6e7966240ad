//! Object store abstraction.

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::AsyncWrite;

use crate::error::StorageResult;

/// Destination for downloaded object bytes.
pub type LocalWriter = dyn AsyncWrite + Unpin + Send;

/// Blob store addressed by bucket and key.
///
/// Implementations are shared across concurrent requests and must be safe
/// for concurrent use.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stream an object into `dest`, returning the number of bytes written.
    ///
    /// Fails with `StorageError::NotFound` when the key does not exist.
    async fn get_object(&self, bucket: &str, key: &str, dest: &mut LocalWriter)
        -> StorageResult<u64>;

    /// Upload a local file as an object readable by anyone.
    async fn put_public_object(&self, bucket: &str, key: &str, source: File) -> StorageResult<()>;

    /// Check that the bucket is reachable.
    async fn check_connectivity(&self, bucket: &str) -> StorageResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
