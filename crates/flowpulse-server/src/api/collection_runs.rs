use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CollectionRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CollectionRunItem {
    collection_run_id: Uuid,
    trigger_source: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    platforms: Vec<RunPlatformItem>,
}

#[derive(Debug, Serialize)]
pub(super) struct RunPlatformItem {
    platform: String,
    fetched: i32,
    created: i32,
    updated: i32,
    unchanged: i32,
    failed: i32,
    error_message: Option<String>,
}

pub(super) async fn list_collection_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CollectionRunsQuery>,
) -> Result<Json<ApiResponse<Vec<CollectionRunItem>>>, ApiError> {
    let rows = flowpulse_db::list_collection_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut data = Vec::with_capacity(rows.len());
    for row in rows {
        let platforms = flowpulse_db::list_run_platforms(&state.pool, row.id)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
            .into_iter()
            .map(|p| RunPlatformItem {
                platform: p.platform,
                fetched: p.fetched,
                created: p.created,
                updated: p.updated,
                unchanged: p.unchanged,
                failed: p.failed,
                error_message: p.error_message,
            })
            .collect();

        data.push(CollectionRunItem {
            collection_run_id: row.public_id,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            platforms,
        });
    }

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_run_item_is_serializable() {
        let item = CollectionRunItem {
            collection_run_id: Uuid::new_v4(),
            trigger_source: "manual".to_string(),
            status: "completed".to_string(),
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            created_at: Utc::now(),
            platforms: vec![RunPlatformItem {
                platform: "forum".to_string(),
                fetched: 30,
                created: 4,
                updated: 20,
                unchanged: 6,
                failed: 0,
                error_message: None,
            }],
        };

        let json = serde_json::to_string(&item).expect("serialize collection run");
        assert!(json.contains("\"trigger_source\":\"manual\""));
        assert!(json.contains("\"fetched\":30"));
    }
}
