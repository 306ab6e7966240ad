//! Application state.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use vproc_db::{DbConfig, JobStore, SqliteJobStore};
use vproc_media::{check_ffmpeg, FfmpegTranscoder, Transcoder};
use vproc_storage::{BlobStore, InMemoryBlobStore, S3Client, S3Config};
use vproc_worker::{VideoPipeline, WorkerConfig};

use crate::config::{ApiConfig, StorageBackend};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<VideoPipeline>,
    pub jobs: Arc<dyn JobStore>,
    pub blobs: Arc<dyn BlobStore>,
    /// Bucket probed by the readiness check
    pub raw_bucket: String,
}

impl AppState {
    /// Create new application state.
    ///
    /// `cancel_rx` flips to `true` on shutdown and aborts in-flight transfers
    /// and FFmpeg processes.
    pub async fn new(
        config: ApiConfig,
        cancel_rx: watch::Receiver<bool>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let worker_config = WorkerConfig::from_env();
        let db_config = DbConfig::from_env();

        let jobs: Arc<dyn JobStore> = Arc::new(SqliteJobStore::connect(&db_config).await?);

        let blobs: Arc<dyn BlobStore> = match config.storage_backend {
            StorageBackend::S3 => Arc::new(S3Client::new(&S3Config::from_env()?)),
            StorageBackend::Memory => {
                if config.is_production() {
                    warn!("STORAGE_BACKEND=memory in production; uploads will never be found");
                }
                warn!("Using in-memory blob store; objects are lost on restart");
                Arc::new(InMemoryBlobStore::new())
            }
        };
        info!("Blob store: {}", blobs.name());

        let mut transcoder = FfmpegTranscoder::new(worker_config.target_height)
            .with_timeout(worker_config.transcode_timeout)
            .with_cancel(cancel_rx.clone());
        match &worker_config.ffmpeg_path {
            Some(path) => {
                if !path.is_file() {
                    warn!("FFMPEG_PATH {} does not exist; every transcode will fail", path.display());
                }
                transcoder = transcoder.with_program(path.clone());
            }
            None => {
                if let Err(e) = check_ffmpeg() {
                    warn!("{}; every transcode will fail until it is installed", e);
                }
            }
        }
        info!("Transcoder: {}", transcoder.name());

        let pipeline =
            VideoPipeline::new(&worker_config, jobs.clone(), blobs.clone(), Arc::new(transcoder))
                .with_cancel(cancel_rx);
        pipeline.workspace().ensure_ready().await?;

        info!(
            "Pipeline ready: raw={} processed={} height={} transfer_timeout={:?}",
            worker_config.raw_bucket,
            worker_config.processed_bucket,
            worker_config.target_height,
            worker_config.transfer_timeout
        );

        Ok(Self::from_parts(
            config,
            pipeline,
            jobs,
            blobs,
            worker_config.raw_bucket,
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn from_parts(
        config: ApiConfig,
        pipeline: VideoPipeline,
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        raw_bucket: impl Into<String>,
    ) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
            jobs,
            blobs,
            raw_bucket: raw_bucket.into(),
        }
    }
}
