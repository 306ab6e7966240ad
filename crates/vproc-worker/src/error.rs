//! Pipeline error types.

use std::fmt;

use thiserror::Error;
use vproc_db::DbError;
use vproc_media::MediaError;
use vproc_models::ValidationError;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Active stages of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Claiming,
    Downloading,
    Transcoding,
    Uploading,
    Finalizing,
    CleaningUp,
}

impl PipelineStage {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claiming => "claiming",
            Self::Downloading => "downloading",
            Self::Transcoding => "transcoding",
            Self::Uploading => "uploading",
            Self::Finalizing => "finalizing",
            Self::CleaningUp => "cleaning_up",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Bad Request: video {job_id} is already being processed.")]
    Conflict { job_id: String },

    #[error("Transfer failed while {stage}: {message}")]
    Transfer {
        stage: PipelineStage,
        message: String,
    },

    #[error("Processing failed: {0}")]
    Transcode(#[from] MediaError),

    #[error("Job store error while {stage}: {source}")]
    Persistence {
        stage: PipelineStage,
        #[source]
        source: DbError,
    },

    #[error("Filesystem error while {stage}: {message}")]
    Filesystem {
        stage: PipelineStage,
        message: String,
    },
}

impl PipelineError {
    pub fn conflict(job_id: impl Into<String>) -> Self {
        Self::Conflict {
            job_id: job_id.into(),
        }
    }

    pub fn download_failed(msg: impl Into<String>) -> Self {
        Self::Transfer {
            stage: PipelineStage::Downloading,
            message: msg.into(),
        }
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::Transfer {
            stage: PipelineStage::Uploading,
            message: msg.into(),
        }
    }

    pub fn persistence(stage: PipelineStage, source: DbError) -> Self {
        Self::Persistence { stage, source }
    }

    pub fn filesystem(stage: PipelineStage, msg: impl Into<String>) -> Self {
        Self::Filesystem {
            stage,
            message: msg.into(),
        }
    }

    /// Stage the run was in when this error was raised.
    ///
    /// `None` for requests rejected before a job could be named.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Validation(_) => None,
            Self::Conflict { .. } => Some(PipelineStage::Claiming),
            Self::Transfer { stage, .. }
            | Self::Persistence { stage, .. }
            | Self::Filesystem { stage, .. } => Some(*stage),
            Self::Transcode(_) => Some(PipelineStage::Transcoding),
        }
    }

    /// Short error class used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict { .. } => "conflict",
            Self::Transfer { .. } => "transfer",
            Self::Transcode(_) => "transcode",
            Self::Persistence { .. } => "persistence",
            Self::Filesystem { .. } => "filesystem",
        }
    }

    /// Errors caused by the request rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Conflict { .. })
    }
}
