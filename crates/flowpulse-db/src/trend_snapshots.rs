//! Append-only history of search-interest observations, one row per
//! trend record per collection run.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TrendSnapshotRow {
    pub id: i64,
    pub record_key: String,
    pub observed_at: DateTime<Utc>,
    pub search_interest: f64,
}

/// Appends one interest observation for a trend record.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_trend_snapshot(
    pool: &PgPool,
    record_key: &str,
    observed_at: DateTime<Utc>,
    search_interest: f64,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO trend_snapshots (record_key, observed_at, search_interest) \
         VALUES ($1, $2, $3)",
    )
    .bind(record_key)
    .bind(observed_at)
    .bind(search_interest)
    .execute(pool)
    .await?;

    Ok(())
}

/// Lists the most recent observations for a record, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_trend_snapshots(
    pool: &PgPool,
    record_key: &str,
    limit: i64,
) -> Result<Vec<TrendSnapshotRow>, DbError> {
    let rows = sqlx::query_as::<_, TrendSnapshotRow>(
        "SELECT id, record_key, observed_at, search_interest \
         FROM trend_snapshots \
         WHERE record_key = $1 \
         ORDER BY observed_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(record_key)
    .bind(limit.clamp(1, 500))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
