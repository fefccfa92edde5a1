//! The merge layer: atomic upsert-by-key for workflow records.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use flowpulse_core::NewWorkflowRecord;

use crate::DbError;

/// A row from the `workflow_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WorkflowRecordRow {
    pub id: i64,
    pub record_key: String,
    pub platform: String,
    pub country: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub evidence_url: String,
    pub metrics: serde_json::Value,
    pub engagement_score: f64,
    pub first_seen_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub collection_run_id: Option<i64>,
}

/// What the merge did with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No record existed for the key; a new one was inserted.
    Created,
    /// Metrics differed; metrics, score, metadata and `last_updated_at`
    /// were replaced.
    Updated,
    /// Metrics were bit-identical to the stored values; nothing was
    /// written.
    Unchanged,
}

const ALL_COLUMNS: &str = "id, record_key, platform, country, title, description, evidence_url, \
     metrics, engagement_score, first_seen_at, last_updated_at, collection_run_id";

/// Merges an incoming record into storage as a single atomic upsert.
///
/// - Key absent: insert with `first_seen_at = last_updated_at = NOW()`,
///   outcome [`MergeOutcome::Created`].
/// - Key present with differing metrics: replace metrics and score, refresh
///   title/description/evidence URL, bump `last_updated_at`, outcome
///   [`MergeOutcome::Updated`]. An unset incoming country keeps the stored
///   one (`COALESCE`): a differently-scoped query must never erase known
///   geography.
/// - Key present with identical metrics: no write at all, outcome
///   [`MergeOutcome::Unchanged`]. Avoids storage churn and
///   `last_updated_at` thrash.
///
/// One `INSERT .. ON CONFLICT .. DO UPDATE .. WHERE` statement, so the
/// compare-and-write is atomic per record even under concurrent runs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn merge_workflow_record(
    pool: &PgPool,
    record: &NewWorkflowRecord,
    run_id: i64,
) -> Result<MergeOutcome, DbError> {
    let metrics = serde_json::to_value(&record.metrics).unwrap_or_else(|_| serde_json::json!({}));

    // `(xmax = 0)` distinguishes a fresh insert from a conflict-update;
    // the `WHERE` clause suppresses the update entirely when metrics are
    // identical, in which case no row comes back.
    let inserted: Option<bool> = sqlx::query_scalar(
        "INSERT INTO workflow_records \
             (record_key, platform, country, title, description, evidence_url, \
              metrics, engagement_score, collection_run_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         ON CONFLICT (record_key) DO UPDATE SET \
             metrics = EXCLUDED.metrics, \
             engagement_score = EXCLUDED.engagement_score, \
             title = EXCLUDED.title, \
             description = EXCLUDED.description, \
             evidence_url = EXCLUDED.evidence_url, \
             country = COALESCE(EXCLUDED.country, workflow_records.country), \
             last_updated_at = NOW(), \
             collection_run_id = EXCLUDED.collection_run_id \
         WHERE workflow_records.metrics IS DISTINCT FROM EXCLUDED.metrics \
         RETURNING (xmax = 0) AS inserted",
    )
    .bind(&record.record_key)
    .bind(record.platform.as_str())
    .bind(record.country.map(flowpulse_core::Country::as_str))
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.evidence_url)
    .bind(&metrics)
    .bind(record.engagement_score)
    .bind(run_id)
    .fetch_optional(pool)
    .await?;

    Ok(match inserted {
        Some(true) => MergeOutcome::Created,
        Some(false) => MergeOutcome::Updated,
        None => MergeOutcome::Unchanged,
    })
}

/// Fetches one record by its stable key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no record has the key, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_record_by_key(pool: &PgPool, record_key: &str) -> Result<WorkflowRecordRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRecordRow>(&format!(
        "SELECT {ALL_COLUMNS} FROM workflow_records WHERE record_key = $1"
    ))
    .bind(record_key)
    .fetch_optional(pool)
    .await?;

    row.ok_or(DbError::NotFound)
}
