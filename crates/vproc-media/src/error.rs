//! Error types for media operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during transcoding.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFmpeg command failed: {message}{}", failure_detail(.exit_code, .stderr))]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }
}

/// Exit code and stderr tail appended to an FFmpeg failure.
fn failure_detail(exit_code: &Option<i32>, stderr: &Option<String>) -> String {
    let mut detail = match exit_code {
        Some(code) => format!(" (exit code {})", code),
        None => " (killed by signal)".to_string(),
    };
    if let Some(stderr) = stderr {
        detail.push_str(": ");
        detail.push_str(stderr);
    }
    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_includes_exit_code_and_stderr() {
        let err = MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            Some("in.mp4: Invalid data found when processing input".to_string()),
            Some(1),
        );
        assert_eq!(
            err.to_string(),
            "FFmpeg command failed: FFmpeg exited with non-zero status (exit code 1): \
             in.mp4: Invalid data found when processing input"
        );
    }

    #[test]
    fn test_sub_second_timeout_is_readable() {
        let err = MediaError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Operation timed out after 250ms");
    }
}
