//! Transcoding engine abstraction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Output height used when none is configured.
pub const DEFAULT_TARGET_HEIGHT: u32 = 360;

/// Opaque transcoding engine.
///
/// Reads `input`, writes `output` (replacing it if present) and reports
/// success or failure only.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()>;

    /// Engine name for logging.
    fn name(&self) -> &'static str;
}

/// Scales video to a fixed height with FFmpeg, keeping the aspect ratio.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    target_height: u32,
    runner: FfmpegRunner,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_HEIGHT)
    }
}

impl FfmpegTranscoder {
    pub fn new(target_height: u32) -> Self {
        Self {
            target_height,
            runner: FfmpegRunner::new(),
        }
    }

    /// Use this FFmpeg binary instead of the one in PATH.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.runner = self.runner.with_program(program);
        self
    }

    /// Kill FFmpeg if it runs longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.runner = self.runner.with_timeout(timeout);
        self
    }

    /// Kill FFmpeg when the signal flips to `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.runner = self.runner.with_cancel(cancel_rx);
        self
    }

    /// Filter expression: width follows the aspect ratio.
    pub fn scale_filter(&self) -> String {
        format!("scale=-1:{}", self.target_height)
    }

    /// Build the command for one input/output pair.
    pub fn command(&self, input: &Path, output: &Path) -> FfmpegCommand {
        FfmpegCommand::new(input, output).video_filter(self.scale_filter())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output: &Path) -> MediaResult<()> {
        let cmd = self.command(input, output);
        self.runner.run(&cmd).await?;
        info!(
            "Transcoded {} -> {} at {}p",
            input.display(),
            output.display(),
            self.target_height
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
