//! Job store abstraction.

use async_trait::async_trait;
use vproc_models::{JobPatch, JobRecord};

use crate::error::DbResult;

/// Single-table store of video job records keyed by job id.
///
/// Implementations are shared across concurrent requests.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Point lookup. `Ok(None)` when no row exists.
    async fn fetch(&self, id: &str) -> DbResult<Option<JobRecord>>;

    /// Insert or merge. Fields the patch leaves `None` keep their stored value.
    async fn upsert(&self, id: &str, patch: &JobPatch) -> DbResult<()>;

    /// Atomically mark a job as processing if it has no status yet.
    ///
    /// Returns `false` when another writer already holds a status for the id.
    async fn claim(&self, id: &str, uid: &str) -> DbResult<bool>;

    /// Delete a record. Returns whether a row was removed.
    async fn delete(&self, id: &str) -> DbResult<bool>;

    /// Cheap round-trip used by readiness checks.
    async fn health_check(&self) -> DbResult<()>;
}
