//! Video job orchestration.
//!
//! This crate provides:
//! - The idempotency gate deciding whether an upload is processed
//! - Blob transfers run as abortable tasks with timeouts
//! - The local workspace for raw and processed files
//! - The pipeline orchestrator with per-stage compensation
//! - Structured job logging and pipeline metrics

pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod transfer;
pub mod workspace;

pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult, PipelineStage};
pub use gate::{Decision, IdempotencyGate};
pub use logging::JobLogger;
pub use pipeline::{PipelineOutcome, VideoPipeline};
pub use transfer::BlobTransfer;
pub use workspace::{WorkDir, Workspace};
