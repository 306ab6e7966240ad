//! FFmpeg CLI wrapper for video transcoding.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with timeout and cancellation via tokio
//! - The `Transcoder` trait and its FFmpeg implementation

pub mod command;
pub mod error;
pub mod transcode;

pub use command::{check_ffmpeg, wait_for_cancel, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use transcode::{FfmpegTranscoder, Transcoder, DEFAULT_TARGET_HEIGHT};
