//! HTTP surface for the fitted pipeline.
//!
//! Routes:
//! - `GET /` welcome text
//! - `GET /health` status and the common-incident set
//! - `GET /predict_disasters?year=Y` per-state forecasts for `Y` in `0..=3000`

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::pipeline::{FitReport, FittedPipeline, StatePrediction, predict_by_year};

pub const MIN_YEAR: i64 = 0;
pub const MAX_YEAR: i64 = 3000;

/// Shared, read-only handler state.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FittedPipeline>,
}

/// Errors surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.to_string(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        error!(error = %err, "Prediction failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct PredictParams {
    year: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub common_incidents: Vec<String>,
    pub fit: FitReport,
}

/// Build the API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/predict_disasters", get(predict_disasters))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(pipeline: Arc<FittedPipeline>, addr: &str) -> Result<()> {
    let app = build_router(AppState { pipeline });
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index() -> &'static str {
    "Welcome to Natural Disaster Prediction API"
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        common_incidents: state.pipeline.common_incidents().to_vec(),
        fit: state.pipeline.report(),
    })
}

async fn predict_disasters(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
) -> Result<Json<Vec<StatePrediction>>, ApiError> {
    let year = validate_year(params.year.as_deref())?;

    let pipeline = state.pipeline.clone();
    let predictions = tokio::task::spawn_blocking(move || predict_by_year(&pipeline, year))
        .await
        .map_err(anyhow::Error::from)??;

    Ok(Json(predictions))
}

/// Parses and bounds-checks the `year` query parameter.
fn validate_year(raw: Option<&str>) -> Result<i32, ApiError> {
    let Some(year) = raw.and_then(|y| y.trim().parse::<i64>().ok()) else {
        return Err(ApiError::bad_request("Year parameter is missing"));
    };
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ApiError::bad_request("Year is out of bounds"));
    }
    // bounds above guarantee the value fits
    Ok(year as i32)
}
