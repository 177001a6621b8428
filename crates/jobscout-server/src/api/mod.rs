mod credential;
mod snapshots;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use jobscout_engine::EngineState;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineState>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    polling: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(50).clamp(1, 500)
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::PUT])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/credential", put(credential::rotate_credential))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(snapshots::get_status))
        .route("/api/jobs", get(snapshots::list_jobs))
        .route("/api/new-jobs", get(snapshots::list_new_jobs))
        .route("/api/requests", get(snapshots::list_requests));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

/// Process liveness. Always 200 while the server runs; `polling` reports
/// whether cool-down is in force.
async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let polling = if state.engine.is_suspended().await {
        "suspended"
    } else {
        "active"
    };
    Json(ApiResponse::new(
        HealthData {
            status: "ok",
            polling,
        },
        req_id.0,
    ))
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(30, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::Utc;
    use jobscout_core::{JobCard, TargetLocation};
    use jobscout_engine::{
        CredentialHolder, EngineSettings, RequestOutcome, StateStore, SuspendReason, SweepBatch,
    };
    use tower::ServiceExt;

    async fn test_engine(dir: &std::path::Path) -> Arc<EngineState> {
        let engine = EngineState::restore(
            EngineSettings::default(),
            vec![
                TargetLocation::new("Toronto", 43.65, -79.38),
                TargetLocation::new("Ottawa", 45.42, -75.70),
            ],
            CredentialHolder::new(Some("initial-credential")),
            StateStore::new(dir),
        )
        .await
        .expect("engine");

        let mut batch = SweepBatch::new(Utc::now());
        engine
            .collect_new(
                &mut batch,
                vec![JobCard {
                    job_id: "JOB-1".to_owned(),
                    job_title: Some("Fulfillment Associate".to_owned()),
                    city: Some("Toronto".to_owned()),
                    state: Some("ON".to_owned()),
                }],
            )
            .await;
        engine.commit_batch(batch).await.expect("commit");
        engine
            .record_outcome("Toronto", RequestOutcome::Ok { jobs: 1 }, None)
            .await;
        engine
            .record_outcome("Ottawa", RequestOutcome::HttpError { status: 503 }, None)
            .await;
        Arc::new(engine)
    }

    fn app(engine: Arc<EngineState>, tokens: &[String]) -> Router {
        let auth = AuthState::from_tokens(tokens, tokens.is_empty()).expect("auth");
        build_app(AppState { engine }, auth, default_rate_limit_state())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json parse"))
    }

    fn rotate_request(token: Option<&str>, credential: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("PUT")
            .uri("/api/credential")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Body::from(
                serde_json::json!({ "credential": credential }).to_string(),
            ))
            .expect("request")
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 50);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(10_000)), 500);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_echoes_request_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let response = app(test_engine(dir.path()).await, &[])
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-42");
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["polling"], "active");
        assert_eq!(json["meta"]["request_id"], "req-42");
    }

    #[tokio::test]
    async fn status_reports_engine_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, json) = get_json(app(test_engine(dir.path()).await, &[]), "/api/status").await;
        assert_eq!(status, StatusCode::OK);
        let data = &json["data"];
        assert_eq!(data["cooldown"]["status"], "active");
        assert_eq!(data["total_jobs"], 1);
        assert_eq!(data["health"]["score"], 50);
        assert_eq!(data["health"]["label"], "unhealthy");
        assert_eq!(data["targets"][1]["target"], "Ottawa");
        assert_eq!(data["credential"]["present"], true);
        assert!(!data.to_string().contains("initial-credential"));
    }

    #[tokio::test]
    async fn jobs_and_audit_log_use_stored_field_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = test_engine(dir.path()).await;

        let (_, jobs) = get_json(app(Arc::clone(&engine), &[]), "/api/jobs").await;
        assert_eq!(jobs["data"][0]["jobId"], "JOB-1");
        assert_eq!(jobs["data"][0]["jobTitle"], "Fulfillment Associate");

        let (_, audit) = get_json(app(engine, &[]), "/api/new-jobs").await;
        assert_eq!(audit["data"].as_array().expect("array").len(), 1);
        assert_eq!(audit["data"][0]["new"][0]["jobId"], "JOB-1");
    }

    #[tokio::test]
    async fn requests_are_newest_first_and_limited() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (status, json) = get_json(
            app(test_engine(dir.path()).await, &[]),
            "/api/requests?limit=1",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let entries = json["data"].as_array().expect("array");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["target"], "Ottawa");
        assert_eq!(entries[0]["outcome"]["kind"], "HTTP_ERROR");
    }

    #[tokio::test]
    async fn credential_rotation_requires_bearer_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = test_engine(dir.path()).await;
        let response = app(engine, &["admin".to_owned()])
            .oneshot(rotate_request(None, "new-credential"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn credential_rotation_resumes_suspended_engine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = test_engine(dir.path()).await;
        let fingerprint = engine.credential().fingerprint().await;
        engine
            .suspend(SuspendReason::AuthFailure, fingerprint)
            .await;

        let response = app(Arc::clone(&engine), &["admin".to_owned()])
            .oneshot(rotate_request(Some("admin"), "new-credential"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        assert_eq!(json["data"]["rotated"], true);
        assert_eq!(json["data"]["resumed"], "credential rotated");
        assert!(!engine.is_suspended().await);
    }

    #[tokio::test]
    async fn blank_credential_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let engine = test_engine(dir.path()).await;
        let response = app(engine, &["admin".to_owned()])
            .oneshot(rotate_request(Some("admin"), "   "))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
