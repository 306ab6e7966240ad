//! Shared data models for the video processing service.
//!
//! This crate provides:
//! - The persisted video job record and its status
//! - Partial patches for null-coalescing upserts
//! - The raw object → job id / uid / output name naming rule
//! - Decoding of push-notification envelopes

pub mod error;
pub mod job;
pub mod naming;
pub mod notification;

// Re-export common types
pub use error::{ValidationError, ValidationResult};
pub use job::{JobPatch, JobRecord, JobStatus};
pub use naming::{JobNames, PROCESSED_PREFIX};
pub use notification::{decode_push_envelope, PushEnvelope, PushMessage, UploadNotification};
