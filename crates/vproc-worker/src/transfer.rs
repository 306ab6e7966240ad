//! Blob transfers between the object store and the workspace.
//!
//! Each transfer runs as its own tokio task and reports once through a
//! oneshot channel. The caller waits under a timeout and the shutdown signal;
//! either one aborts the task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use vproc_media::wait_for_cancel;
use vproc_storage::BlobStore;

use crate::error::{PipelineError, PipelineResult};
use crate::workspace::{WorkDir, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Download,
    Upload,
}

impl Direction {
    fn error(self, msg: String) -> PipelineError {
        match self {
            Self::Download => PipelineError::download_failed(msg),
            Self::Upload => PipelineError::upload_failed(msg),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

/// Moves raw videos in and processed videos out.
#[derive(Clone)]
pub struct BlobTransfer {
    store: Arc<dyn BlobStore>,
    workspace: Workspace,
    raw_bucket: String,
    processed_bucket: String,
    timeout: Duration,
    cancel_rx: Option<watch::Receiver<bool>>,
}

impl BlobTransfer {
    pub fn new(
        store: Arc<dyn BlobStore>,
        workspace: Workspace,
        raw_bucket: impl Into<String>,
        processed_bucket: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            workspace,
            raw_bucket: raw_bucket.into(),
            processed_bucket: processed_bucket.into(),
            timeout,
            cancel_rx: None,
        }
    }

    /// Abort in-flight transfers when the signal flips to `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Fetch `name` from the raw bucket into the raw directory.
    ///
    /// The local file is created before the task starts, so an aborted
    /// transfer never creates it afterwards.
    pub async fn download(&self, name: &str) -> PipelineResult<u64> {
        let mut file = self
            .workspace
            .create_local(WorkDir::Raw, name)
            .await
            .map_err(|e| PipelineError::download_failed(e.to_string()))?;

        let store = Arc::clone(&self.store);
        let bucket = self.raw_bucket.clone();
        let key = name.to_string();

        self.dispatch(Direction::Download, name, async move {
            store
                .get_object(&bucket, &key, &mut file)
                .await
                .map_err(|e| {
                    if e.is_not_found() {
                        PipelineError::download_failed(format!(
                            "raw video {} not found in bucket {}",
                            key, bucket
                        ))
                    } else {
                        PipelineError::download_failed(e.to_string())
                    }
                })
        })
        .await
    }

    /// Publish `name` from the processed directory with a public-read ACL.
    pub async fn upload(&self, name: &str) -> PipelineResult<()> {
        let file = self
            .workspace
            .open_local(WorkDir::Processed, name)
            .await
            .map_err(|e| PipelineError::upload_failed(e.to_string()))?;

        let store = Arc::clone(&self.store);
        let bucket = self.processed_bucket.clone();
        let key = name.to_string();

        self.dispatch(Direction::Upload, name, async move {
            store
                .put_public_object(&bucket, &key, file)
                .await
                .map_err(|e| PipelineError::upload_failed(e.to_string()))
        })
        .await
    }

    async fn dispatch<T, F>(&self, direction: Direction, name: &str, work: F) -> PipelineResult<T>
    where
        T: Send + 'static,
        F: Future<Output = PipelineResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            // Receiver is gone only when the caller already gave up
            let _ = tx.send(work.await);
        });
        debug!("Dispatched {} of {}", direction.verb(), name);

        tokio::select! {
            reply = rx => match reply {
                Ok(result) => {
                    if result.is_ok() {
                        info!("Finished {} of {}", direction.verb(), name);
                    }
                    result
                }
                Err(_) => Err(direction.error(format!(
                    "{} task for {} ended without a result",
                    direction.verb(),
                    name
                ))),
            },
            _ = tokio::time::sleep(self.timeout) => {
                handle.abort();
                warn!("{} of {} timed out after {:?}", direction.verb(), name, self.timeout);
                Err(direction.error(format!(
                    "{} of {} timed out after {:?}",
                    direction.verb(),
                    name,
                    self.timeout
                )))
            }
            _ = wait_for_cancel(self.cancel_rx.clone()) => {
                handle.abort();
                warn!("{} of {} cancelled", direction.verb(), name);
                Err(direction.error(format!("{} of {} cancelled", direction.verb(), name)))
            }
        }
    }
}
