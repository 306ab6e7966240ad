//! Naming rule linking a raw object to its job record and output object.

use crate::error::{ValidationError, ValidationResult};

/// Prefix prepended to the raw object name to form the output object name.
pub const PROCESSED_PREFIX: &str = "processed-";

/// Names derived from a raw object name.
///
/// For `abc-123.mp4`: job id `abc-123`, uid `abc`, output
/// `processed-abc-123.mp4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobNames {
    /// Raw object key, also the local raw file name
    pub raw_name: String,
    /// Portion of the raw name before the first `.`
    pub job_id: String,
    /// Portion of the job id before the first `-`
    pub uid: String,
    /// Output object key, also the local processed file name
    pub output_name: String,
}

impl JobNames {
    /// Derive job names from a raw object name.
    ///
    /// Local files are named after the raw object, so names that would
    /// escape the working directories are rejected, as is any name whose job
    /// id would be empty (e.g. `.mp4`).
    pub fn from_raw_name(raw_name: &str) -> ValidationResult<Self> {
        if raw_name.is_empty() {
            return Err(ValidationError::MissingName);
        }

        if raw_name.contains('/') || raw_name.contains('\\') || raw_name.contains('\0') {
            return Err(ValidationError::invalid_name(format!(
                "'{}' contains a path separator or NUL byte",
                raw_name
            )));
        }

        let job_id = raw_name.split('.').next().unwrap_or_default();
        if job_id.is_empty() {
            return Err(ValidationError::invalid_name(format!(
                "'{}' has no job id before its extension",
                raw_name
            )));
        }

        let uid = job_id.split('-').next().unwrap_or_default();

        Ok(Self {
            raw_name: raw_name.to_string(),
            job_id: job_id.to_string(),
            uid: uid.to_string(),
            output_name: format!("{}{}", PROCESSED_PREFIX, raw_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_for_typical_upload() {
        let names = JobNames::from_raw_name("abc-123.mp4").unwrap();
        assert_eq!(names.raw_name, "abc-123.mp4");
        assert_eq!(names.job_id, "abc-123");
        assert_eq!(names.uid, "abc");
        assert_eq!(names.output_name, "processed-abc-123.mp4");
    }

    #[test]
    fn test_job_id_stops_at_first_dot() {
        let names = JobNames::from_raw_name("u1-1722762965875.final.mov").unwrap();
        assert_eq!(names.job_id, "u1-1722762965875");
        assert_eq!(names.output_name, "processed-u1-1722762965875.final.mov");
    }

    #[test]
    fn test_uid_stops_at_first_dash() {
        let names =
            JobNames::from_raw_name("38f3c375-b5c6-47dd-8afa-968857396ffd-1722762965875.mp4")
                .unwrap();
        assert_eq!(names.uid, "38f3c375");
        assert_eq!(
            names.job_id,
            "38f3c375-b5c6-47dd-8afa-968857396ffd-1722762965875"
        );
    }

    #[test]
    fn test_name_without_extension_or_dash() {
        let names = JobNames::from_raw_name("clip").unwrap();
        assert_eq!(names.job_id, "clip");
        assert_eq!(names.uid, "clip");
        assert_eq!(names.output_name, "processed-clip");
    }

    #[test]
    fn test_rejects_empty_and_unsafe_names() {
        assert_eq!(
            JobNames::from_raw_name("").unwrap_err(),
            ValidationError::MissingName
        );
        assert!(matches!(
            JobNames::from_raw_name(".mp4"),
            Err(ValidationError::InvalidName(_))
        ));
        assert!(matches!(
            JobNames::from_raw_name(".."),
            Err(ValidationError::InvalidName(_))
        ));
        assert!(matches!(
            JobNames::from_raw_name("../etc/passwd"),
            Err(ValidationError::InvalidName(_))
        ));
        assert!(matches!(
            JobNames::from_raw_name("dir\\video.mp4"),
            Err(ValidationError::InvalidName(_))
        ));
    }
}
