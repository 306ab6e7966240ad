//! SQLite job store.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use vproc_models::{JobPatch, JobRecord, JobStatus};

use crate::config::DbConfig;
use crate::error::{DbError, DbResult};
use crate::store::JobStore;

/// Row shape of the `videos` table.
#[derive(Debug, FromRow)]
struct VideoRow {
    id: String,
    uid: Option<String>,
    filename: Option<String>,
    status: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

impl TryFrom<VideoRow> for JobRecord {
    type Error = DbError;

    fn try_from(row: VideoRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_deref() {
            None => None,
            Some(s) => Some(
                s.parse::<JobStatus>()
                    .map_err(|e| DbError::decode(format!("video {}: {}", row.id, e)))?,
            ),
        };

        Ok(JobRecord {
            id: row.id,
            uid: row.uid,
            filename: row.filename,
            status,
            title: row.title,
            description: row.description,
        })
    }
}

/// Job store backed by a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Connect and create the schema if needed.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (use [`SqliteJobStore::in_memory`])
    /// - `sqlite://videos.db?mode=rwc` - File-based, created if missing
    pub async fn connect(config: &DbConfig) -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await
            .map_err(|e| DbError::connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("Job store ready at {}", config.database_url);
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// Every SQLite connection to `:memory:` opens its own database, so the
    /// pool is pinned to a single connection that never expires.
    pub async fn in_memory() -> DbResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| DbError::connection(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the `videos` table.
    async fn run_migrations(&self) -> DbResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS videos (
                id TEXT PRIMARY KEY NOT NULL,
                uid TEXT,
                filename TEXT,
                status TEXT,
                title TEXT,
                description TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl JobStore for SqliteJobStore {
    async fn fetch(&self, id: &str) -> DbResult<Option<JobRecord>> {
        let row = sqlx::query_as::<_, VideoRow>(
            "SELECT id, uid, filename, status, title, description FROM videos WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn upsert(&self, id: &str, patch: &JobPatch) -> DbResult<()> {
        debug!("Upserting video {} with {:?}", id, patch);

        sqlx::query(
            r#"
            INSERT INTO videos (id, uid, filename, status, title, description)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                uid = COALESCE(excluded.uid, videos.uid),
                filename = COALESCE(excluded.filename, videos.filename),
                status = COALESCE(excluded.status, videos.status),
                title = COALESCE(excluded.title, videos.title),
                description = COALESCE(excluded.description, videos.description)
            "#,
        )
        .bind(id)
        .bind(patch.uid.as_deref())
        .bind(patch.filename.as_deref())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn claim(&self, id: &str, uid: &str) -> DbResult<bool> {
        // The conflict update only fires for rows without a status, so a
        // zero row count means another writer holds the job.
        let result = sqlx::query(
            r#"
            INSERT INTO videos (id, uid, status)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                uid = COALESCE(excluded.uid, videos.uid),
                status = excluded.status
            WHERE videos.status IS NULL
            "#,
        )
        .bind(id)
        .bind(uid)
        .bind(JobStatus::Processing.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &str) -> DbResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
