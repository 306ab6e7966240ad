//! Per-job structured logging.
//!
//! A job owns one `job` span carrying the job id, uid and raw object name.
//! The span's `stage` field follows the pipeline, so every event logged while
//! a stage runs (transfers, FFmpeg) is attributed to it.

use tracing::{error, field, info, warn, Span};
use vproc_models::JobNames;

use crate::error::PipelineStage;

/// Logger bound to a single job's span.
#[derive(Debug, Clone)]
pub struct JobLogger {
    span: Span,
}

impl JobLogger {
    pub fn new(names: &JobNames) -> Self {
        let span = tracing::info_span!(
            "job",
            job_id = %names.job_id,
            uid = %names.uid,
            raw_name = %names.raw_name,
            stage = field::Empty,
        );
        Self { span }
    }

    /// The job span; instrument the run with it.
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// Move the span to `stage` and log the transition.
    pub fn enter_stage(&self, stage: PipelineStage) {
        self.span.record("stage", field::display(stage));
        info!(parent: &self.span, "Entering stage {}", stage);
    }

    pub fn info(&self, message: &str) {
        info!(parent: &self.span, "{}", message);
    }

    pub fn warn(&self, message: &str) {
        warn!(parent: &self.span, "{}", message);
    }

    pub fn error(&self, message: &str) {
        error!(parent: &self.span, "{}", message);
    }
}
