//! HTTP API: health, metrics, analysis and recommendation queries

use advisor_lib::{
    error::{AnalysisError, StoreError, ValidationError},
    health::{ComponentStatus, HealthRegistry},
    models::{RecommendationRecord, ServiceAnalysisRequest, ServiceKey},
    recommender::AnalysisPipeline,
    store::{sort_for_dashboard, AccountOverview, RecommendationFilter},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub pipeline: Arc<AnalysisPipeline>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, pipeline: Arc<AnalysisPipeline>) -> Self {
        Self {
            health_registry,
            pipeline,
        }
    }
}

/// Errors returned to API callers as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unavailable(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Unavailable(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// One entry of a batch response
#[derive(Debug, Serialize)]
pub struct BatchItem {
    #[serde(flatten)]
    pub service: ServiceKey,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RecommendationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn new(service: ServiceKey, result: Result<RecommendationRecord, AnalysisError>) -> Self {
        match result {
            Ok(record) => Self {
                service,
                status: "ok",
                record: Some(record),
                error: None,
            },
            Err(e) => Self {
                service,
                status: "error",
                record: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ServiceAnalysisRequest>,
) -> Result<Json<RecommendationRecord>, ApiError> {
    let record = state.pipeline.analyze(&request, Utc::now()).await?;
    Ok(Json(record))
}

async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(requests): Json<Vec<ServiceAnalysisRequest>>,
) -> Json<Vec<BatchItem>> {
    let outcomes = state.pipeline.analyze_batch(requests, Utc::now()).await;
    Json(
        outcomes
            .into_iter()
            .map(|o| BatchItem::new(o.key, o.result))
            .collect(),
    )
}

async fn list_recommendations(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(filter): Query<RecommendationFilter>,
) -> Result<Json<Vec<RecommendationRecord>>, ApiError> {
    let mut records = state.pipeline.store().query(&account_id, &filter).await?;
    sort_for_dashboard(&mut records);
    Ok(Json(records))
}

async fn get_recommendation(
    State(state): State<Arc<AppState>>,
    Path((account_id, cluster_name, service_name)): Path<(String, String, String)>,
) -> Result<Json<RecommendationRecord>, ApiError> {
    let key = ServiceKey::new(account_id, cluster_name, service_name);
    state
        .pipeline
        .store()
        .get(&key)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no recommendation for {}", key)))
}

async fn account_overview(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountOverview>, ApiError> {
    let records = state
        .pipeline
        .store()
        .query(&account_id, &RecommendationFilter::default())
        .await?;
    Ok(Json(AccountOverview::from_records(account_id, &records)))
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/analyze", post(analyze))
        .route("/api/v1/analyze/batch", post(analyze_batch))
        .route("/api/v1/recommendations/:account_id", get(list_recommendations))
        .route(
            "/api/v1/recommendations/:account_id/:cluster_name/:service_name",
            get(get_recommendation),
        )
        .route("/api/v1/accounts/:account_id/overview", get(account_overview))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
