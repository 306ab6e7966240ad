//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use vproc_media::DEFAULT_TARGET_HEIGHT;

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Local directory holding downloaded raw videos
    pub raw_dir: PathBuf,
    /// Local directory holding transcoded output
    pub processed_dir: PathBuf,
    /// Bucket the raw uploads land in
    pub raw_bucket: String,
    /// Bucket receiving processed videos (public-read)
    pub processed_bucket: String,
    /// Upper bound for a single download or upload
    pub transfer_timeout: Duration,
    /// Upper bound for one transcode
    pub transcode_timeout: Duration,
    /// Output height in pixels
    pub target_height: u32,
    /// FFmpeg binary; looked up in PATH when unset
    pub ffmpeg_path: Option<PathBuf>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("./raw-videos"),
            processed_dir: PathBuf::from("./processed-videos"),
            raw_bucket: "raw-videos".to_string(),
            processed_bucket: "processed-videos".to_string(),
            transfer_timeout: Duration::from_secs(600), // 10 minutes
            transcode_timeout: Duration::from_secs(1800), // 30 minutes
            target_height: DEFAULT_TARGET_HEIGHT,
            ffmpeg_path: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            raw_dir: std::env::var("RAW_VIDEO_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.raw_dir),
            processed_dir: std::env::var("PROCESSED_VIDEO_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.processed_dir),
            raw_bucket: std::env::var("RAW_VIDEO_BUCKET_NAME").unwrap_or(defaults.raw_bucket),
            processed_bucket: std::env::var("PROCESSED_VIDEO_BUCKET_NAME")
                .unwrap_or(defaults.processed_bucket),
            transfer_timeout: Duration::from_secs(
                std::env::var("TRANSFER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(600),
            ),
            transcode_timeout: Duration::from_secs(
                std::env::var("TRANSCODE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1800),
            ),
            target_height: std::env::var("TARGET_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|h| *h > 0)
                .unwrap_or(defaults.target_height),
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}
