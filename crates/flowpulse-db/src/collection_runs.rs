//! Database operations for `collection_runs` and `collection_run_platforms`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `collection_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub trigger_source: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `collection_run_platforms` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RunPlatformRow {
    pub id: i64,
    pub collection_run_id: i64,
    pub platform: String,
    pub fetched: i32,
    pub created: i32,
    pub updated: i32,
    pub unchanged: i32,
    pub failed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-platform accounting to persist at the end of a run.
#[derive(Debug, Clone, Default)]
pub struct NewRunPlatform {
    pub fetched: i32,
    pub created: i32,
    pub updated: i32,
    pub unchanged: i32,
    pub failed: i32,
    pub error_message: Option<String>,
}

/// Terminal status of a collection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    PartiallyFailed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::PartiallyFailed => "partially_failed",
        }
    }
}

// ---------------------------------------------------------------------------
// collection_runs operations
// ---------------------------------------------------------------------------

/// Creates a new collection run in `running` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_collection_run(
    pool: &PgPool,
    trigger_source: &str,
) -> Result<CollectionRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, CollectionRunRow>(
        "INSERT INTO collection_runs (public_id, trigger_source, status) \
         VALUES ($1, $2, 'running') \
         RETURNING id, public_id, trigger_source, status, started_at, completed_at, created_at",
    )
    .bind(public_id)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a running run as terminal and sets `completed_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not in
/// `running` status, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_collection_run(
    pool: &PgPool,
    id: i64,
    status: RunStatus,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = $1, completed_at = NOW() \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(status.as_str())
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Lists recent runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunRow>(
        "SELECT id, public_id, trigger_source, status, started_at, completed_at, created_at \
         FROM collection_runs \
         ORDER BY created_at DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Timestamp of the most recently completed run, if any.
///
/// Partially-failed runs count: they did complete, just not cleanly.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn last_completed_run_at(pool: &PgPool) -> Result<Option<DateTime<Utc>>, DbError> {
    let completed_at: Option<DateTime<Utc>> = sqlx::query_scalar(
        "SELECT MAX(completed_at) FROM collection_runs WHERE completed_at IS NOT NULL",
    )
    .fetch_one(pool)
    .await?;

    Ok(completed_at)
}

// ---------------------------------------------------------------------------
// collection_run_platforms operations
// ---------------------------------------------------------------------------

/// Upserts one platform's accounting for a run.
///
/// A platform appears at most once per run; re-upserting replaces the
/// counts (the orchestrator writes once per platform, but a retried write
/// after a transient failure must not violate the unique constraint).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_run_platform(
    pool: &PgPool,
    collection_run_id: i64,
    platform: &str,
    counts: &NewRunPlatform,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO collection_run_platforms \
             (collection_run_id, platform, fetched, created, updated, unchanged, failed, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (collection_run_id, platform) DO UPDATE SET \
             fetched = EXCLUDED.fetched, \
             created = EXCLUDED.created, \
             updated = EXCLUDED.updated, \
             unchanged = EXCLUDED.unchanged, \
             failed = EXCLUDED.failed, \
             error_message = EXCLUDED.error_message",
    )
    .bind(collection_run_id)
    .bind(platform)
    .bind(counts.fetched)
    .bind(counts.created)
    .bind(counts.updated)
    .bind(counts.unchanged)
    .bind(counts.failed)
    .bind(&counts.error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Lists the per-platform accounting rows for one run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_run_platforms(
    pool: &PgPool,
    collection_run_id: i64,
) -> Result<Vec<RunPlatformRow>, DbError> {
    let rows = sqlx::query_as::<_, RunPlatformRow>(
        "SELECT id, collection_run_id, platform, fetched, created, updated, unchanged, \
                failed, error_message, created_at \
         FROM collection_run_platforms \
         WHERE collection_run_id = $1 \
         ORDER BY platform",
    )
    .bind(collection_run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
