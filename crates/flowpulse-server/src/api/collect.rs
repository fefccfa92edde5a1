use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
pub(super) struct CollectAccepted {
    status: &'static str,
}

/// Kicks off a collection run in the background and returns immediately.
///
/// A full run can take minutes, so the handler never waits for it; run
/// progress is visible through `/api/v1/collection-runs`. The run slot is
/// reserved before the 202 goes out, so an accepted trigger cannot lose a
/// startup race to a concurrent one. Responds 409 when a run is already
/// in flight.
pub(super) async fn trigger_collect(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<(StatusCode, Json<ApiResponse<CollectAccepted>>), ApiError> {
    let permit = state.collector.begin().map_err(|_| {
        ApiError::new(
            req_id.0.clone(),
            "conflict",
            "a collection run is already in progress",
        )
    })?;

    let collector = state.collector.clone();
    tokio::spawn(async move {
        match collector.run_with_permit(permit, "api").await {
            Ok(report) => {
                tracing::info!(
                    run_id = report.run_id,
                    status = report.status.as_str(),
                    "api-triggered collection run finished"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "api-triggered collection run failed");
            }
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse {
            data: CollectAccepted { status: "started" },
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}
