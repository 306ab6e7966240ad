//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Number of stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
///
/// Always overwrites the output and logs at `error` level, so stderr only
/// carries the reason for a failure.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    input: PathBuf,
    output: PathBuf,
    /// Output arguments (after -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            "-i".to_string(),
            self.input.to_string_lossy().to_string(),
        ];
        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());
        args
    }
}

/// How a child process stopped.
enum Exit {
    Finished(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Runner for FFmpeg commands with timeout and cancellation.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Explicit binary; `ffmpeg` from PATH when unset
    program: Option<PathBuf>,
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout
    timeout: Option<Duration>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run this binary instead of looking `ffmpeg` up in PATH.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn resolve_program(&self) -> MediaResult<PathBuf> {
        match &self.program {
            Some(path) if path.is_file() => Ok(path.clone()),
            Some(_) => Err(MediaError::FfmpegNotFound),
            None => check_ffmpeg(),
        }
    }

    /// Run an FFmpeg command to completion.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let program = self.resolve_program()?;

        if !cmd.input().exists() {
            return Err(MediaError::FileNotFound(cmd.input().to_path_buf()));
        }

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", program.display(), args.join(" "));

        let mut child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr_task = child.stderr.take().map(|stderr| {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
                while let Ok(Some(line)) = lines.next_line().await {
                    if tail.len() == STDERR_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                tail.into_iter().collect::<Vec<_>>().join("\n")
            })
        });

        let exit = tokio::select! {
            status = child.wait() => Exit::Finished(status),
            _ = sleep_for(self.timeout) => Exit::TimedOut,
            _ = wait_for_cancel(self.cancel_rx.clone()) => Exit::Cancelled,
        };

        let status = match exit {
            Exit::Finished(status) => status?,
            Exit::TimedOut => {
                let timeout = self.timeout.unwrap_or_default();
                warn!("FFmpeg timed out after {:?}, killing process", timeout);
                let _ = child.kill().await;
                return Err(MediaError::Timeout(timeout));
            }
            Exit::Cancelled => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                return Err(MediaError::Cancelled);
            }
        };

        if status.success() {
            return Ok(());
        }

        let stderr = match stderr_task {
            Some(task) => task.await.ok().filter(|s| !s.is_empty()),
            None => None,
        };
        warn!(
            exit_code = ?status.code(),
            input = %cmd.input().display(),
            "FFmpeg failed: {}",
            stderr.as_deref().unwrap_or("<no stderr>")
        );

        Err(MediaError::ffmpeg_failed(
            "FFmpeg exited with non-zero status",
            stderr,
            status.code(),
        ))
    }
}

async fn sleep_for(timeout: Option<Duration>) {
    match timeout {
        Some(timeout) => tokio::time::sleep(timeout).await,
        None => std::future::pending().await,
    }
}

/// Resolve once the signal reads `true`.
///
/// Never resolves without a receiver, or when the sender goes away without
/// cancelling.
pub async fn wait_for_cancel(cancel_rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = cancel_rx else {
        return std::future::pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}
