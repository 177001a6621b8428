use axum::{
    extract::{Query, State},
    Extension, Json,
};
use jobscout_core::JobRecord;
use jobscout_engine::{AuditEntry, EngineStatus, RequestLogEntry};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{normalize_limit, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RequestsQuery {
    pub limit: Option<usize>,
}

pub(super) async fn get_status(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<EngineStatus>> {
    Json(ApiResponse::new(state.engine.status().await, req_id.0))
}

pub(super) async fn list_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<JobRecord>>> {
    Json(ApiResponse::new(state.engine.jobs().await, req_id.0))
}

pub(super) async fn list_new_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<AuditEntry>>> {
    Json(ApiResponse::new(state.engine.new_jobs_log().await, req_id.0))
}

pub(super) async fn list_requests(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RequestsQuery>,
) -> Json<ApiResponse<Vec<RequestLogEntry>>> {
    let limit = normalize_limit(query.limit);
    Json(ApiResponse::new(
        state.engine.recent_requests(limit).await,
        req_id.0,
    ))
}
