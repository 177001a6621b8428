use axum::{extract::State, Extension, Json};
use chrono::Utc;
use jobscout_engine::{EngineError, Rotation};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct RotateCredentialBody {
    pub credential: String,
}

#[derive(Debug, Serialize)]
pub(super) struct RotateCredentialData {
    pub rotated: bool,
    pub fingerprint: Option<String>,
    /// Why cool-down ended, when this rotation ended it.
    pub resumed: Option<String>,
}

/// Replaces the held credential and runs the resume check straight away,
/// so a suspended engine resumes without waiting for the next check.
pub(super) async fn rotate_credential(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<RotateCredentialBody>,
) -> Result<Json<ApiResponse<RotateCredentialData>>, ApiError> {
    let rotation = state
        .engine
        .credential()
        .replace(&body.credential)
        .await
        .map_err(|e| match e {
            EngineError::InvalidCredential(msg) => {
                ApiError::new(req_id.0.clone(), "validation_error", msg)
            }
            other => {
                tracing::error!(error = %other, "credential: rotation failed");
                ApiError::new(req_id.0.clone(), "internal_error", "credential rotation failed")
            }
        })?;

    let resumed = state.engine.check_resume(Utc::now()).await;
    let data = RotateCredentialData {
        rotated: matches!(rotation, Rotation::Rotated(_)),
        fingerprint: state
            .engine
            .credential()
            .fingerprint()
            .await
            .map(|fp| fp.short().to_owned()),
        resumed: resumed.map(|r| r.to_string()),
    };
    Ok(Json(ApiResponse::new(data, req_id.0)))
}
