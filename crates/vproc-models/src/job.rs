//! Video job record and status.
//!
//! A job record exists only once a job has been claimed. "No record" is the
//! absent state; it is never stored as a status value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Persisted status of a video job.
///
/// Status only moves forward: `Processing` → `Processed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Claimed by a pipeline run that has not finished
    Processing,
    /// Transcoded output uploaded and recorded
    Processed,
}

impl JobStatus {
    /// Get string representation of the status, as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Processed => "processed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(JobStatus::Processing),
            "processed" => Ok(JobStatus::Processed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// A stored video job.
///
/// `None` means the column holds no value. `Some(String::new())` is a stored
/// empty string and is distinct from absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Raw object name without its extension (primary key)
    pub id: String,
    /// Owner portion of the id
    pub uid: Option<String>,
    /// Output object key, set on finalize
    pub filename: Option<String>,
    /// Pipeline status; `None` for rows written by other clients before a claim
    pub status: Option<JobStatus>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl JobRecord {
    /// Create an empty record for an id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn is_processing(&self) -> bool {
        self.status == Some(JobStatus::Processing)
    }

    pub fn is_processed(&self) -> bool {
        self.status == Some(JobStatus::Processed)
    }
}

/// Partial update of a job record.
///
/// Only `Some` fields participate in an upsert; the id is never part of a
/// patch because it is immutable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPatch {
    pub uid: Option<String>,
    pub filename: Option<String>,
    pub status: Option<JobStatus>,
    pub title: Option<String>,
    pub description: Option<String>,
}

impl JobPatch {
    /// Patch written when a job is claimed.
    pub fn claim(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
            status: Some(JobStatus::Processing),
            ..Default::default()
        }
    }

    /// Patch written when a job's output has been uploaded.
    pub fn finalize(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            status: Some(JobStatus::Processed),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
