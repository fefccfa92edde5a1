//! Read-model queries used by the API layer: filtered/sorted/paginated
//! record listings and the dashboard aggregates.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::records::WorkflowRecordRow;
use crate::DbError;

/// Sort column for record listings.
///
/// Raw-metric sorts are limited to the known metric names; anything else
/// falls back to the engagement score. The variants carry the exact SQL
/// expression, so no user input ever reaches the query text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    EngagementScore,
    LastUpdated,
    Views,
    Likes,
    Comments,
    Replies,
    SearchInterest,
}

impl SortKey {
    /// Parses an API-facing sort name; unknown names sort by score.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "recent" | "last_updated" => SortKey::LastUpdated,
            "views" => SortKey::Views,
            "likes" => SortKey::Likes,
            "comments" => SortKey::Comments,
            "replies" => SortKey::Replies,
            "search_interest" => SortKey::SearchInterest,
            _ => SortKey::EngagementScore,
        }
    }

    fn sql_expr(self) -> &'static str {
        match self {
            SortKey::EngagementScore => "engagement_score",
            SortKey::LastUpdated => "last_updated_at",
            SortKey::Views => "COALESCE((metrics->>'views')::DOUBLE PRECISION, 0)",
            SortKey::Likes => "COALESCE((metrics->>'likes')::DOUBLE PRECISION, 0)",
            SortKey::Comments => "COALESCE((metrics->>'comments')::DOUBLE PRECISION, 0)",
            SortKey::Replies => "COALESCE((metrics->>'replies')::DOUBLE PRECISION, 0)",
            SortKey::SearchInterest => {
                "COALESCE((metrics->>'search_interest')::DOUBLE PRECISION, 0)"
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Parses an API-facing order name; anything but `asc` is descending.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Input filters for record listing.
#[derive(Debug, Clone)]
pub struct RecordFilters<'a> {
    pub platform: Option<&'a str>,
    pub country: Option<&'a str>,
    /// Free-text match against title and description.
    pub search: Option<&'a str>,
    pub sort: SortKey,
    pub order: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

impl Default for RecordFilters<'_> {
    fn default() -> Self {
        Self {
            platform: None,
            country: None,
            search: None,
            sort: SortKey::EngagementScore,
            order: SortOrder::Desc,
            limit: 50,
            offset: 0,
        }
    }
}

/// `%` and `_` are wildcards inside an ILIKE pattern; free text from the
/// caller has to match literally.
fn escape_like(term: &str) -> String {
    term.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Lists records matching the filters plus the total match count.
///
/// Ties on the sort column break by `record_key`, so repeated pages of
/// the same query are disjoint and contiguous. An offset past the total
/// yields an empty page, not an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either query fails.
pub async fn list_workflow_records(
    pool: &PgPool,
    filters: RecordFilters<'_>,
) -> Result<(Vec<WorkflowRecordRow>, i64), DbError> {
    let limit = filters.limit.clamp(1, 200);
    let offset = filters.offset.max(0);
    let search = filters.search.map(escape_like);

    const WHERE_CLAUSE: &str = "($1::TEXT IS NULL OR platform = $1) \
         AND ($2::TEXT IS NULL OR country = $2) \
         AND ($3::TEXT IS NULL OR title ILIKE '%' || $3 || '%' \
              OR description ILIKE '%' || $3 || '%')";

    // Sort expression and direction come from closed enums, never from
    // caller input.
    let select = format!(
        "SELECT id, record_key, platform, country, title, description, evidence_url, \
                metrics, engagement_score, first_seen_at, last_updated_at, collection_run_id \
         FROM workflow_records \
         WHERE {WHERE_CLAUSE} \
         ORDER BY {} {}, record_key ASC \
         LIMIT $4 OFFSET $5",
        filters.sort.sql_expr(),
        filters.order.sql()
    );

    let rows = sqlx::query_as::<_, WorkflowRecordRow>(&select)
        .bind(filters.platform)
        .bind(filters.country)
        .bind(search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let total: i64 = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM workflow_records WHERE {WHERE_CLAUSE}"
    ))
    .bind(filters.platform)
    .bind(filters.country)
    .bind(search.as_deref())
    .fetch_one(pool)
    .await?;

    Ok((rows, total))
}

// ---------------------------------------------------------------------------
// Dashboard aggregates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlatformCount {
    pub platform: String,
    pub count: i64,
    pub avg_engagement: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CountryCount {
    pub country: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TopRecord {
    pub title: String,
    pub platform: String,
    pub engagement_score: f64,
}

#[derive(Debug, Clone)]
pub struct StatsSummary {
    pub total_records: i64,
    pub platforms: Vec<PlatformCount>,
    pub countries: Vec<CountryCount>,
    pub top_records: Vec<TopRecord>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Grouped aggregates over the record store for the stats endpoint.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any query fails.
pub async fn stats(pool: &PgPool) -> Result<StatsSummary, DbError> {
    let total_records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workflow_records")
        .fetch_one(pool)
        .await?;

    let platforms = sqlx::query_as::<_, PlatformCount>(
        "SELECT platform, COUNT(*) AS count, AVG(engagement_score) AS avg_engagement \
         FROM workflow_records \
         GROUP BY platform \
         ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await?;

    let countries = sqlx::query_as::<_, CountryCount>(
        "SELECT country, COUNT(*) AS count \
         FROM workflow_records \
         GROUP BY country \
         ORDER BY count DESC",
    )
    .fetch_all(pool)
    .await?;

    let top_records = sqlx::query_as::<_, TopRecord>(
        "SELECT title, platform, engagement_score \
         FROM workflow_records \
         ORDER BY engagement_score DESC, record_key ASC \
         LIMIT 10",
    )
    .fetch_all(pool)
    .await?;

    let last_run_at = crate::collection_runs::last_completed_run_at(pool).await?;

    Ok(StatsSummary {
        total_records,
        platforms,
        countries,
        top_records,
        last_run_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_key_parse_maps_known_names() {
        assert_eq!(SortKey::parse("recent"), SortKey::LastUpdated);
        assert_eq!(SortKey::parse("views"), SortKey::Views);
        assert_eq!(SortKey::parse("search_interest"), SortKey::SearchInterest);
    }

    #[test]
    fn sort_key_parse_falls_back_to_score() {
        assert_eq!(SortKey::parse("engagement"), SortKey::EngagementScore);
        assert_eq!(
            SortKey::parse("'; DROP TABLE workflow_records; --"),
            SortKey::EngagementScore
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain text"), "plain text");
    }

    #[test]
    fn sort_order_defaults_to_desc() {
        assert_eq!(SortOrder::parse("asc"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("ASC"), SortOrder::Asc);
        assert_eq!(SortOrder::parse("desc"), SortOrder::Desc);
        assert_eq!(SortOrder::parse("sideways"), SortOrder::Desc);
    }
}
