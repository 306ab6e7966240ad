//! Pipeline metrics.
//!
//! Recorded through the `metrics` facade; the API binary installs the
//! Prometheus recorder.

use std::time::Duration;

use metrics::{counter, histogram};

use crate::error::{PipelineError, PipelineStage};

/// Metric names as constants for consistency.
pub mod names {
    pub const PIPELINE_RUNS_TOTAL: &str = "vproc_pipeline_runs_total";
    pub const PIPELINE_FAILURES_TOTAL: &str = "vproc_pipeline_failures_total";
    pub const STAGE_DURATION_SECONDS: &str = "vproc_stage_duration_seconds";
    pub const CLEANUP_FAILURES_TOTAL: &str = "vproc_cleanup_failures_total";
}

/// Record a finished run by outcome (`completed`, `already_processed`,
/// `rejected`, `failed`).
pub fn record_run(outcome: &'static str) {
    counter!(names::PIPELINE_RUNS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a failed run with the stage it stopped in.
pub fn record_failure(error: &PipelineError) {
    let stage = error.stage().map(|s| s.as_str()).unwrap_or("ingress");
    counter!(
        names::PIPELINE_FAILURES_TOTAL,
        "stage" => stage,
        "kind" => error.kind()
    )
    .increment(1);
}

/// Record how long a stage took, successful or not.
pub fn record_stage_duration(stage: PipelineStage, elapsed: Duration) {
    histogram!(names::STAGE_DURATION_SECONDS, "stage" => stage.as_str())
        .record(elapsed.as_secs_f64());
}

/// Record a best-effort cleanup that could not delete its file.
pub fn record_cleanup_failure(stage: PipelineStage) {
    counter!(names::CLEANUP_FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
}
