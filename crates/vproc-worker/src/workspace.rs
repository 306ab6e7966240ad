//! Local working directories for raw and processed videos.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tracing::{debug, warn};

/// One of the two working directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkDir {
    Raw,
    Processed,
}

/// Owns the raw and processed working directories.
///
/// Files are named after their object keys, so concurrent jobs for
/// different uploads never share a path.
#[derive(Debug, Clone)]
pub struct Workspace {
    raw_dir: PathBuf,
    processed_dir: PathBuf,
}

impl Workspace {
    pub fn new(raw_dir: impl Into<PathBuf>, processed_dir: impl Into<PathBuf>) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            processed_dir: processed_dir.into(),
        }
    }

    pub fn dir(&self, dir: WorkDir) -> &Path {
        match dir {
            WorkDir::Raw => &self.raw_dir,
            WorkDir::Processed => &self.processed_dir,
        }
    }

    /// Create both directories. Existing directories are left alone.
    pub async fn ensure_ready(&self) -> io::Result<()> {
        for dir in [&self.raw_dir, &self.processed_dir] {
            fs::create_dir_all(dir).await.map_err(|e| {
                io::Error::new(e.kind(), format!("{}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }

    pub fn local_path(&self, dir: WorkDir, name: &str) -> PathBuf {
        self.dir(dir).join(name)
    }

    /// Create (or truncate) a file for writing.
    pub async fn create_local(&self, dir: WorkDir, name: &str) -> io::Result<File> {
        let path = self.local_path(dir, name);
        File::create(&path)
            .await
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    }

    /// Open an existing file for reading.
    pub async fn open_local(&self, dir: WorkDir, name: &str) -> io::Result<File> {
        let path = self.local_path(dir, name);
        File::open(&path)
            .await
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    }

    /// Delete a file. Fails if it does not exist.
    pub async fn remove_local(&self, dir: WorkDir, name: &str) -> io::Result<()> {
        let path = self.local_path(dir, name);
        fs::remove_file(&path)
            .await
            .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))?;
        debug!("Removed {}", path.display());
        Ok(())
    }

    /// Delete a file, logging instead of failing.
    ///
    /// Returns `false` only if the file exists and could not be removed.
    pub async fn discard_local(&self, dir: WorkDir, name: &str) -> bool {
        match self.remove_local(dir, name).await {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Nothing to discard: {}", e);
                true
            }
            Err(e) => {
                warn!("Failed to discard local file: {}", e);
                false
            }
        }
    }
}
