//! S3-compatible client implementation.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::store::{BlobStore, LocalWriter};

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Region passed to request signing
    pub region: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Use path-style addressing instead of virtual-hosted buckets
    pub force_path_style: bool,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("SPACES_ENDPOINT")
                .unwrap_or_else(|_| "https://sfo3.digitaloceanspaces.com".to_string()),
            region: std::env::var("SPACES_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: std::env::var("SPACES_KEY")
                .map_err(|_| StorageError::config_error("SPACES_KEY not set"))?,
            secret_access_key: std::env::var("SPACES_SECRET")
                .map_err(|_| StorageError::config_error("SPACES_SECRET not set"))?,
            force_path_style: std::env::var("SPACES_FORCE_PATH_STYLE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct S3Client {
    client: Client,
}

impl S3Client {
    /// Create a new client from configuration.
    pub fn new(config: &S3Config) -> Self {
        // Secrets mounted from files carry a trailing newline
        let credentials = Credentials::new(
            config.access_key_id.trim(),
            config.secret_access_key.trim(),
            None,
            None,
            "spaces",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(config.force_path_style)
            .build();

        Self {
            client: Client::from_conf(sdk_config),
        }
    }
}

#[async_trait]
impl BlobStore for S3Client {
    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        dest: &mut LocalWriter,
    ) -> StorageResult<u64> {
        debug!("Downloading s3://{}/{}", bucket, key);

        let mut response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = e
                    .as_service_error()
                    .map(GetObjectError::is_no_such_key)
                    .unwrap_or(false);
                let msg = DisplayErrorContext(&e).to_string();
                if missing || msg.contains("NoSuchKey") {
                    StorageError::not_found(format!("{}/{}", bucket, key))
                } else {
                    StorageError::download_failed(msg)
                }
            })?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .body
            .try_next()
            .await
            .map_err(|e| StorageError::download_failed(e.to_string()))?
        {
            dest.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        dest.flush().await?;

        info!("Downloaded s3://{}/{} ({} bytes)", bucket, key, written);
        Ok(written)
    }

    async fn put_public_object(&self, bucket: &str, key: &str, source: File) -> StorageResult<()> {
        debug!("Uploading s3://{}/{}", bucket, key);

        let body = ByteStream::read_from()
            .file(source)
            .build()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(DisplayErrorContext(&e).to_string()))?;

        info!("Uploaded s3://{}/{}", bucket, key);
        Ok(())
    }

    async fn check_connectivity(&self, bucket: &str) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::AwsSdk(format!(
                    "connectivity check failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "s3"
    }
}
