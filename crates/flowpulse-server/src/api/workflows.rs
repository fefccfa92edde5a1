use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use flowpulse_db::{RecordFilters, SortKey, SortOrder, WorkflowRecordRow};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct WorkflowQuery {
    pub platform: Option<String>,
    pub country: Option<String>,
    /// Free-text filter over title and description.
    pub q: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct WorkflowItem {
    record_key: String,
    platform: String,
    country: Option<String>,
    title: String,
    description: Option<String>,
    evidence_url: String,
    metrics: serde_json::Value,
    engagement_score: f64,
    first_seen_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct WorkflowPage {
    items: Vec<WorkflowItem>,
    total: i64,
    limit: i64,
    offset: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct TrendPoint {
    observed_at: DateTime<Utc>,
    search_interest: f64,
}

impl From<WorkflowRecordRow> for WorkflowItem {
    fn from(row: WorkflowRecordRow) -> Self {
        Self {
            record_key: row.record_key,
            platform: row.platform,
            country: row.country,
            title: row.title,
            description: row.description,
            evidence_url: row.evidence_url,
            metrics: row.metrics,
            engagement_score: row.engagement_score,
            first_seen_at: row.first_seen_at,
            last_updated_at: row.last_updated_at,
        }
    }
}

pub(super) async fn list_workflows(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<WorkflowQuery>,
) -> Result<Json<ApiResponse<WorkflowPage>>, ApiError> {
    let limit = normalize_limit(query.limit);
    let offset = query.offset.unwrap_or(0).max(0);

    let filters = RecordFilters {
        platform: query.platform.as_deref(),
        country: query.country.as_deref(),
        search: query.q.as_deref(),
        sort: query.sort.as_deref().map_or(SortKey::EngagementScore, SortKey::parse),
        order: query.order.as_deref().map_or(SortOrder::Desc, SortOrder::parse),
        limit,
        offset,
    };

    let (rows, total) = flowpulse_db::list_workflow_records(&state.pool, filters)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = WorkflowPage {
        items: rows.into_iter().map(WorkflowItem::from).collect(),
        total,
        limit,
        offset,
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_workflow(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(record_key): Path<String>,
) -> Result<Json<ApiResponse<WorkflowItem>>, ApiError> {
    let row = flowpulse_db::get_record_by_key(&state.pool, &record_key)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: WorkflowItem::from(row),
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendQuery {
    pub limit: Option<i64>,
}

pub(super) async fn list_workflow_trend(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(record_key): Path<String>,
    Query(query): Query<TrendQuery>,
) -> Result<Json<ApiResponse<Vec<TrendPoint>>>, ApiError> {
    let rows =
        flowpulse_db::list_trend_snapshots(&state.pool, &record_key, normalize_limit(query.limit))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| TrendPoint {
            observed_at: row.observed_at,
            search_interest: row.search_interest,
        })
        .collect();

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
