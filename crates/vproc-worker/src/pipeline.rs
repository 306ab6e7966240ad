//! Video pipeline orchestrator.
//!
//! One run per upload notification, stages strictly in order:
//!
//! ```text
//! Claiming → Downloading → Transcoding → Uploading → Finalizing → CleaningUp → Done
//! ```
//!
//! A failed download rolls the job record back so the upload can be
//! notified again. Failed transcodes and uploads only discard local files;
//! the record stays at `processing`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;
use tracing::Instrument;
use vproc_db::JobStore;
use vproc_media::Transcoder;
use vproc_models::JobNames;
use vproc_storage::BlobStore;

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult, PipelineStage};
use crate::gate::{Decision, IdempotencyGate};
use crate::logging::JobLogger;
use crate::metrics;
use crate::transfer::BlobTransfer;
use crate::workspace::{WorkDir, Workspace};

/// Successful end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Output uploaded and recorded; local files removed
    Completed { job_id: String, output_name: String },
    /// A previous run already finished this job
    AlreadyProcessed { job_id: String },
}

/// Drives a raw upload through claim, transfer, transcode and finalize.
///
/// Shared by all requests; collaborators are held behind trait objects.
pub struct VideoPipeline {
    gate: IdempotencyGate,
    transfer: BlobTransfer,
    transcoder: Arc<dyn Transcoder>,
    workspace: Workspace,
}

impl VideoPipeline {
    pub fn new(
        config: &WorkerConfig,
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let workspace = Workspace::new(config.raw_dir.clone(), config.processed_dir.clone());
        let transfer = BlobTransfer::new(
            blobs,
            workspace.clone(),
            &config.raw_bucket,
            &config.processed_bucket,
            config.transfer_timeout,
        );

        Self {
            gate: IdempotencyGate::new(jobs),
            transfer,
            transcoder,
            workspace,
        }
    }

    /// Abort in-flight transfers when the signal flips to `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.transfer = self.transfer.with_cancel(cancel_rx);
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Process the raw object `raw_name`.
    pub async fn run(&self, raw_name: &str) -> PipelineResult<PipelineOutcome> {
        let names = match JobNames::from_raw_name(raw_name) {
            Ok(names) => names,
            Err(e) => {
                let err = PipelineError::from(e);
                metrics::record_run("rejected");
                metrics::record_failure(&err);
                return Err(err);
            }
        };

        let logger = JobLogger::new(&names);
        let result = self
            .execute(&names, &logger)
            .instrument(logger.span())
            .await;

        match &result {
            Ok(PipelineOutcome::Completed { output_name, .. }) => {
                metrics::record_run("completed");
                logger.info(&format!("Job completed: published {}", output_name));
            }
            Ok(PipelineOutcome::AlreadyProcessed { .. }) => {
                metrics::record_run("already_processed");
                logger.info("Job already processed, nothing to do");
            }
            Err(e) if e.is_client_error() => {
                metrics::record_run("rejected");
                metrics::record_failure(e);
                logger.warn(&format!("Job rejected: {}", e));
            }
            Err(e) => {
                metrics::record_run("failed");
                metrics::record_failure(e);
                let stage = e.stage().map(|s| s.as_str()).unwrap_or("ingress");
                logger.error(&format!("Job failed while {}: {}", stage, e));
            }
        }

        result
    }

    async fn execute(
        &self,
        names: &JobNames,
        logger: &JobLogger,
    ) -> PipelineResult<PipelineOutcome> {
        logger.info("Job started");

        if let Some(outcome) = self
            .timed(PipelineStage::Claiming, logger, self.claim(names))
            .await?
        {
            return Ok(outcome);
        }

        if let Err(e) = self
            .timed(
                PipelineStage::Downloading,
                logger,
                self.transfer.download(&names.raw_name),
            )
            .await
        {
            self.undo_claim(names, logger).await;
            return Err(e);
        }

        let input = self.workspace.local_path(WorkDir::Raw, &names.raw_name);
        let output = self
            .workspace
            .local_path(WorkDir::Processed, &names.output_name);
        if let Err(e) = self
            .timed(
                PipelineStage::Transcoding,
                logger,
                self.transcoder.transcode(&input, &output),
            )
            .await
        {
            self.discard_local_files(names, PipelineStage::Transcoding)
                .await;
            return Err(e.into());
        }

        if let Err(e) = self
            .timed(
                PipelineStage::Uploading,
                logger,
                self.transfer.upload(&names.output_name),
            )
            .await
        {
            self.discard_local_files(names, PipelineStage::Uploading).await;
            return Err(e);
        }

        // Local files stay put if the record cannot be written
        self.timed(
            PipelineStage::Finalizing,
            logger,
            self.gate.finalize(&names.job_id, &names.output_name),
        )
        .await?;

        self.timed(PipelineStage::CleaningUp, logger, self.clean_up(names))
            .await?;

        Ok(PipelineOutcome::Completed {
            job_id: names.job_id.clone(),
            output_name: names.output_name.clone(),
        })
    }

    /// Decide and claim. `Some` ends the run early with that outcome.
    async fn claim(&self, names: &JobNames) -> PipelineResult<Option<PipelineOutcome>> {
        match self.gate.decide(&names.job_id).await? {
            Decision::New => {}
            Decision::Rejected => return Err(PipelineError::conflict(&names.job_id)),
            Decision::AlreadyDone => {
                return Ok(Some(PipelineOutcome::AlreadyProcessed {
                    job_id: names.job_id.clone(),
                }))
            }
        }

        if self.gate.claim(&names.job_id, &names.uid).await? {
            return Ok(None);
        }

        // Lost the race to a concurrent request; answer from what it wrote
        match self.gate.decide(&names.job_id).await? {
            Decision::AlreadyDone => Ok(Some(PipelineOutcome::AlreadyProcessed {
                job_id: names.job_id.clone(),
            })),
            Decision::New | Decision::Rejected => Err(PipelineError::conflict(&names.job_id)),
        }
    }

    /// Download failed: forget the claim and drop any partial raw file.
    async fn undo_claim(&self, names: &JobNames, logger: &JobLogger) {
        match self.gate.rollback(&names.job_id).await {
            Ok(true) => logger.info("Claim rolled back"),
            Ok(false) => logger.warn("No record to roll back"),
            Err(e) => logger.error(&format!("Rollback failed: {}", e)),
        }

        if !self
            .workspace
            .discard_local(WorkDir::Raw, &names.raw_name)
            .await
        {
            metrics::record_cleanup_failure(PipelineStage::Downloading);
        }
    }

    async fn discard_local_files(&self, names: &JobNames, stage: PipelineStage) {
        let raw = self
            .workspace
            .discard_local(WorkDir::Raw, &names.raw_name)
            .await;
        let processed = self
            .workspace
            .discard_local(WorkDir::Processed, &names.output_name)
            .await;
        if !(raw && processed) {
            metrics::record_cleanup_failure(stage);
        }
    }

    /// Remove both local files after a successful finalize.
    async fn clean_up(&self, names: &JobNames) -> PipelineResult<()> {
        let raw = self
            .workspace
            .remove_local(WorkDir::Raw, &names.raw_name)
            .await;
        let processed = self
            .workspace
            .remove_local(WorkDir::Processed, &names.output_name)
            .await;

        raw.and(processed)
            .map_err(|e| PipelineError::filesystem(PipelineStage::CleaningUp, e.to_string()))
    }

    async fn timed<T>(
        &self,
        stage: PipelineStage,
        logger: &JobLogger,
        work: impl Future<Output = T>,
    ) -> T {
        logger.enter_stage(stage);
        let started = Instant::now();
        let out = work.await;
        metrics::record_stage_duration(stage, started.elapsed());
        out
    }
}
