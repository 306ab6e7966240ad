//! End-to-end pipeline runs against in-memory collaborators.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use vproc_db::{DbError, DbResult, JobStore, SqliteJobStore};
use vproc_media::{FfmpegTranscoder, MediaError, MediaResult, Transcoder};
use vproc_models::{JobPatch, JobRecord, JobStatus};
use vproc_storage::{BlobStore, InMemoryBlobStore, LocalWriter, StorageResult};
use vproc_worker::{
    PipelineError, PipelineOutcome, PipelineStage, VideoPipeline, WorkDir, WorkerConfig,
};

const RAW_BUCKET: &str = "raw-bucket";
const PROCESSED_BUCKET: &str = "processed-bucket";

/// Copies the input to the output and counts calls.
#[derive(Default)]
struct CopyTranscoder {
    calls: AtomicUsize,
}

#[async_trait]
impl Transcoder for CopyTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}

/// Leaves a partial output behind and fails.
struct FailingTranscoder;

#[async_trait]
impl Transcoder for FailingTranscoder {
    async fn transcode(&self, _input: &Path, output: &Path) -> MediaResult<()> {
        tokio::fs::write(output, b"partial").await?;
        Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("Invalid data found when processing input".to_string()),
            Some(1),
        ))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Blocks until released, then copies.
#[derive(Default)]
struct GatedTranscoder {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl Transcoder for GatedTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        self.entered.notify_one();
        self.release.notified().await;
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Produces output but consumes its input, so cleanup finds no raw file.
struct ConsumingTranscoder;

#[async_trait]
impl Transcoder for ConsumingTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        tokio::fs::rename(input, output).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "consuming"
    }
}

/// Blob store whose downloads never finish.
struct StalledStore;

#[async_trait]
impl BlobStore for StalledStore {
    async fn get_object(&self, _: &str, _: &str, _: &mut LocalWriter) -> StorageResult<u64> {
        std::future::pending().await
    }

    async fn put_public_object(&self, _: &str, _: &str, _: tokio::fs::File) -> StorageResult<()> {
        std::future::pending().await
    }

    async fn check_connectivity(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stalled"
    }
}

/// Job store that cannot write the final status.
struct FinalizeFailsStore {
    inner: SqliteJobStore,
}

#[async_trait]
impl JobStore for FinalizeFailsStore {
    async fn fetch(&self, id: &str) -> DbResult<Option<JobRecord>> {
        self.inner.fetch(id).await
    }

    async fn upsert(&self, _id: &str, _patch: &JobPatch) -> DbResult<()> {
        Err(DbError::connection("database is locked"))
    }

    async fn claim(&self, id: &str, uid: &str) -> DbResult<bool> {
        self.inner.claim(id, uid).await
    }

    async fn delete(&self, id: &str) -> DbResult<bool> {
        self.inner.delete(id).await
    }

    async fn health_check(&self) -> DbResult<()> {
        self.inner.health_check().await
    }
}

struct Harness {
    _root: TempDir,
    jobs: Arc<dyn JobStore>,
    blobs: Arc<InMemoryBlobStore>,
    pipeline: Arc<VideoPipeline>,
}

impl Harness {
    async fn new(transcoder: Arc<dyn Transcoder>) -> Self {
        let jobs: Arc<dyn JobStore> = Arc::new(SqliteJobStore::in_memory().await.unwrap());
        Self::with_store(jobs, transcoder).await
    }

    async fn with_store(jobs: Arc<dyn JobStore>, transcoder: Arc<dyn Transcoder>) -> Self {
        let root = TempDir::new().unwrap();
        let config = WorkerConfig {
            raw_dir: root.path().join("raw-videos"),
            processed_dir: root.path().join("processed-videos"),
            raw_bucket: RAW_BUCKET.to_string(),
            processed_bucket: PROCESSED_BUCKET.to_string(),
            transfer_timeout: Duration::from_secs(5),
            ..WorkerConfig::default()
        };
        let blobs = Arc::new(InMemoryBlobStore::new());
        let pipeline = VideoPipeline::new(&config, jobs.clone(), blobs.clone(), transcoder);
        pipeline.workspace().ensure_ready().await.unwrap();

        Self {
            _root: root,
            jobs,
            blobs,
            pipeline: Arc::new(pipeline),
        }
    }

    fn upload_raw(&self, name: &str) {
        self.blobs.insert(RAW_BUCKET, name, b"raw video bytes".to_vec());
    }

    async fn record(&self, id: &str) -> Option<JobRecord> {
        self.jobs.fetch(id).await.unwrap()
    }

    fn local_files(&self) -> Vec<PathBuf> {
        let ws = self.pipeline.workspace();
        [WorkDir::Raw, WorkDir::Processed]
            .into_iter()
            .flat_map(|dir| std::fs::read_dir(ws.dir(dir)).unwrap())
            .map(|entry| entry.unwrap().path())
            .collect()
    }
}

#[tokio::test]
async fn test_fresh_upload_completes() {
    let transcoder = Arc::new(CopyTranscoder::default());
    let h = Harness::new(transcoder.clone()).await;
    h.upload_raw("abc-123.mp4");

    let outcome = h.pipeline.run("abc-123.mp4").await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::Completed {
            job_id: "abc-123".to_string(),
            output_name: "processed-abc-123.mp4".to_string(),
        }
    );
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);

    let record = h.record("abc-123").await.unwrap();
    assert_eq!(record.status, Some(JobStatus::Processed));
    assert_eq!(record.uid.as_deref(), Some("abc"));
    assert_eq!(record.filename.as_deref(), Some("processed-abc-123.mp4"));

    assert_eq!(
        h.blobs.object(PROCESSED_BUCKET, "processed-abc-123.mp4").unwrap(),
        b"raw video bytes"
    );
    assert!(h.blobs.is_public(PROCESSED_BUCKET, "processed-abc-123.mp4"));
    assert!(h.local_files().is_empty());
}

#[tokio::test]
async fn test_in_flight_job_is_rejected() {
    let transcoder = Arc::new(CopyTranscoder::default());
    let h = Harness::new(transcoder.clone()).await;
    h.upload_raw("abc-123.mp4");
    h.jobs.claim("abc-123", "abc").await.unwrap();

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert!(matches!(err, PipelineError::Conflict { .. }));
    assert!(err.is_client_error());
    assert!(h.local_files().is_empty());
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert!(h.record("abc-123").await.unwrap().is_processing());
}

#[tokio::test]
async fn test_processed_job_short_circuits() {
    let transcoder = Arc::new(CopyTranscoder::default());
    let h = Harness::new(transcoder.clone()).await;
    h.upload_raw("abc-123.mp4");
    h.jobs.claim("abc-123", "abc").await.unwrap();
    h.jobs
        .upsert("abc-123", &JobPatch::finalize("processed-abc-123.mp4"))
        .await
        .unwrap();

    let outcome = h.pipeline.run("abc-123.mp4").await.unwrap();

    assert_eq!(
        outcome,
        PipelineOutcome::AlreadyProcessed {
            job_id: "abc-123".to_string()
        }
    );
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);
    assert!(h.local_files().is_empty());
    assert!(h.blobs.object(PROCESSED_BUCKET, "processed-abc-123.mp4").is_none());
}

#[tokio::test]
async fn test_invalid_name_touches_nothing() {
    let h = Harness::new(Arc::new(CopyTranscoder::default())).await;

    let err = h.pipeline.run("").await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    let err = h.pipeline.run("../etc/passwd").await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));

    assert!(h.local_files().is_empty());
}

#[tokio::test]
async fn test_download_failure_rolls_back() {
    let transcoder = Arc::new(CopyTranscoder::default());
    let h = Harness::new(transcoder.clone()).await;

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Downloading));
    assert!(!err.is_client_error());
    assert!(h.record("abc-123").await.is_none());
    assert!(h.local_files().is_empty());
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 0);

    // The notification can be retried once the object exists
    h.upload_raw("abc-123.mp4");
    let outcome = h.pipeline.run("abc-123.mp4").await.unwrap();
    assert!(matches!(outcome, PipelineOutcome::Completed { .. }));
}

#[tokio::test]
async fn test_transcode_failure_leaves_job_processing() {
    let h = Harness::new(Arc::new(FailingTranscoder)).await;
    h.upload_raw("abc-123.mp4");

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert!(matches!(err, PipelineError::Transcode(_)));
    assert!(h.local_files().is_empty());
    assert!(h.record("abc-123").await.unwrap().is_processing());

    let retry = h.pipeline.run("abc-123.mp4").await.unwrap_err();
    assert!(matches!(retry, PipelineError::Conflict { .. }));
}

#[tokio::test]
async fn test_upload_failure_discards_local_files() {
    let h = Harness::new(Arc::new(CopyTranscoder::default())).await;
    h.upload_raw("abc-123.mp4");
    h.blobs.set_fail_uploads(true);

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Uploading));
    assert!(h.local_files().is_empty());
    assert!(h.record("abc-123").await.unwrap().is_processing());
    assert!(h.blobs.object(PROCESSED_BUCKET, "processed-abc-123.mp4").is_none());
}

#[tokio::test]
async fn test_finalize_failure_keeps_local_files() {
    let jobs: Arc<dyn JobStore> = Arc::new(FinalizeFailsStore {
        inner: SqliteJobStore::in_memory().await.unwrap(),
    });
    let h = Harness::with_store(jobs, Arc::new(CopyTranscoder::default())).await;
    h.upload_raw("abc-123.mp4");

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Persistence {
            stage: PipelineStage::Finalizing,
            ..
        }
    ));
    assert_eq!(h.local_files().len(), 2);
    assert!(h.record("abc-123").await.unwrap().is_processing());
    assert!(h.blobs.is_public(PROCESSED_BUCKET, "processed-abc-123.mp4"));
}

#[tokio::test]
async fn test_cleanup_failure_after_finalize() {
    let h = Harness::new(Arc::new(ConsumingTranscoder)).await;
    h.upload_raw("abc-123.mp4");

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Filesystem {
            stage: PipelineStage::CleaningUp,
            ..
        }
    ));
    // The job itself went through
    assert!(h.record("abc-123").await.unwrap().is_processed());
    assert!(h.local_files().is_empty());

    let outcome = h.pipeline.run("abc-123.mp4").await.unwrap();
    assert!(matches!(outcome, PipelineOutcome::AlreadyProcessed { .. }));
}

#[tokio::test]
async fn test_duplicate_notifications() {
    let transcoder = Arc::new(GatedTranscoder::default());
    let h = Harness::new(transcoder.clone()).await;
    h.upload_raw("abc-123.mp4");

    let pipeline = h.pipeline.clone();
    let first = tokio::spawn(async move { pipeline.run("abc-123.mp4").await });
    transcoder.entered.notified().await;

    let second = h.pipeline.run("abc-123.mp4").await.unwrap_err();
    assert!(matches!(second, PipelineError::Conflict { .. }));

    transcoder.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(
        outcome,
        PipelineOutcome::Completed {
            job_id: "abc-123".to_string(),
            output_name: "processed-abc-123.mp4".to_string(),
        }
    );

    let third = h.pipeline.run("abc-123.mp4").await.unwrap();
    assert_eq!(
        third,
        PipelineOutcome::AlreadyProcessed {
            job_id: "abc-123".to_string()
        }
    );
}

#[tokio::test]
async fn test_concurrent_runs_transcode_once() {
    let transcoder = Arc::new(CopyTranscoder::default());
    let h = Harness::new(transcoder.clone()).await;
    h.upload_raw("abc-123.mp4");

    let runs: Vec<_> = (0..4)
        .map(|_| {
            let pipeline = h.pipeline.clone();
            tokio::spawn(async move { pipeline.run("abc-123.mp4").await })
        })
        .collect();

    let mut completed = 0;
    for run in runs {
        match run.await.unwrap() {
            Ok(PipelineOutcome::Completed { .. }) => completed += 1,
            Ok(PipelineOutcome::AlreadyProcessed { .. }) => {}
            Err(e) => assert!(matches!(e, PipelineError::Conflict { .. })),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_download_timeout_rolls_back() {
    let root = TempDir::new().unwrap();
    let config = WorkerConfig {
        raw_dir: root.path().join("raw-videos"),
        processed_dir: root.path().join("processed-videos"),
        transfer_timeout: Duration::from_millis(100),
        ..WorkerConfig::default()
    };
    let jobs: Arc<dyn JobStore> = Arc::new(SqliteJobStore::in_memory().await.unwrap());
    let pipeline = VideoPipeline::new(
        &config,
        jobs.clone(),
        Arc::new(StalledStore),
        Arc::new(CopyTranscoder::default()),
    );
    pipeline.workspace().ensure_ready().await.unwrap();

    let err = pipeline.run("abc-123.mp4").await.unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Downloading));
    assert!(err.to_string().contains("timed out after 100ms"));
    assert!(jobs.fetch("abc-123").await.unwrap().is_none());

    // Nothing reappears once the aborted task has wound down
    tokio::time::sleep(Duration::from_millis(100)).await;
    let raw = std::fs::read_dir(root.path().join("raw-videos")).unwrap().count();
    assert_eq!(raw, 0);
}

/// Runs the real FFmpeg transcoder against a stalling stand-in binary.
#[cfg(unix)]
#[tokio::test]
async fn test_transcode_timeout_discards_local_files() {
    use std::os::unix::fs::PermissionsExt;

    let bin = TempDir::new().unwrap();
    let ffmpeg = bin.path().join("ffmpeg");
    std::fs::write(&ffmpeg, "#!/bin/sh\nsleep 30\n").unwrap();
    std::fs::set_permissions(&ffmpeg, std::fs::Permissions::from_mode(0o755)).unwrap();

    let transcoder = FfmpegTranscoder::default()
        .with_program(&ffmpeg)
        .with_timeout(Duration::from_millis(200));
    let h = Harness::new(Arc::new(transcoder)).await;
    h.upload_raw("abc-123.mp4");

    let err = h.pipeline.run("abc-123.mp4").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Transcode(MediaError::Timeout(_))
    ));
    assert_eq!(err.stage(), Some(PipelineStage::Transcoding));
    assert!(h.local_files().is_empty());
    assert!(h.record("abc-123").await.unwrap().is_processing());
}
