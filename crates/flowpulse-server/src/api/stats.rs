use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct StatsData {
    total_records: i64,
    platforms: Vec<PlatformStats>,
    countries: Vec<CountryStats>,
    top_records: Vec<TopRecordItem>,
    last_run_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(super) struct PlatformStats {
    platform: String,
    count: i64,
    avg_engagement: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(super) struct CountryStats {
    country: Option<String>,
    count: i64,
}

#[derive(Debug, Serialize)]
pub(super) struct TopRecordItem {
    title: String,
    platform: String,
    engagement_score: f64,
}

pub(super) async fn get_stats(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<StatsData>>, ApiError> {
    let summary = flowpulse_db::stats(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = StatsData {
        total_records: summary.total_records,
        platforms: summary
            .platforms
            .into_iter()
            .map(|p| PlatformStats {
                platform: p.platform,
                count: p.count,
                avg_engagement: p.avg_engagement,
            })
            .collect(),
        countries: summary
            .countries
            .into_iter()
            .map(|c| CountryStats {
                country: c.country,
                count: c.count,
            })
            .collect(),
        top_records: summary
            .top_records
            .into_iter()
            .map(|r| TopRecordItem {
                title: r.title,
                platform: r.platform,
                engagement_score: r.engagement_score,
            })
            .collect(),
        last_run_at: summary.last_run_at,
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_data_is_serializable() {
        let data = StatsData {
            total_records: 3,
            platforms: vec![PlatformStats {
                platform: "video".to_string(),
                count: 2,
                avg_engagement: Some(51.0),
            }],
            countries: vec![CountryStats {
                country: None,
                count: 1,
            }],
            top_records: vec![TopRecordItem {
                title: "n8n tutorial".to_string(),
                platform: "video".to_string(),
                engagement_score: 61.2,
            }],
            last_run_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&data).expect("serialize stats");
        assert!(json.contains("\"total_records\":3"));
        assert!(json.contains("\"country\":null"));
    }
}
