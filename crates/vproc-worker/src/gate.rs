//! Idempotency gate over the job store.

use std::sync::Arc;

use tracing::{debug, info};
use vproc_db::JobStore;
use vproc_models::{JobPatch, JobRecord, JobStatus};

use crate::error::{PipelineError, PipelineResult, PipelineStage};

/// Whether a notification should start processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// No record, or a record without status
    New,
    /// Another request is processing the job
    Rejected,
    /// The job already finished
    AlreadyDone,
}

impl Decision {
    /// Classify a stored record.
    pub fn for_record(record: Option<&JobRecord>) -> Self {
        match record.and_then(|r| r.status) {
            None => Self::New,
            Some(JobStatus::Processing) => Self::Rejected,
            Some(JobStatus::Processed) => Self::AlreadyDone,
        }
    }
}

/// Decides, claims, finalizes and rolls back jobs.
#[derive(Clone)]
pub struct IdempotencyGate {
    store: Arc<dyn JobStore>,
}

impl IdempotencyGate {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub async fn fetch(&self, id: &str) -> PipelineResult<Option<JobRecord>> {
        self.store
            .fetch(id)
            .await
            .map_err(|e| PipelineError::persistence(PipelineStage::Claiming, e))
    }

    pub async fn decide(&self, id: &str) -> PipelineResult<Decision> {
        let record = self.fetch(id).await?;
        let decision = Decision::for_record(record.as_ref());
        debug!("Job {} decision: {:?}", id, decision);
        Ok(decision)
    }

    /// Mark the job as processing.
    ///
    /// Returns `false` if a concurrent request claimed it first.
    pub async fn claim(&self, id: &str, uid: &str) -> PipelineResult<bool> {
        let claimed = self
            .store
            .claim(id, uid)
            .await
            .map_err(|e| PipelineError::persistence(PipelineStage::Claiming, e))?;
        if claimed {
            info!("Claimed job {} for uid {}", id, uid);
        }
        Ok(claimed)
    }

    pub async fn finalize(&self, id: &str, filename: &str) -> PipelineResult<()> {
        self.store
            .upsert(id, &JobPatch::finalize(filename))
            .await
            .map_err(|e| PipelineError::persistence(PipelineStage::Finalizing, e))
    }

    /// Remove the job record so the upload can be retried.
    pub async fn rollback(&self, id: &str) -> PipelineResult<bool> {
        self.store
            .delete(id)
            .await
            .map_err(|e| PipelineError::persistence(PipelineStage::Downloading, e))
    }
}
