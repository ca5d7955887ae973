//! Request handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{Method, StatusCode, Uri};
use axum::{BoxError, Json};
use serde::{Deserialize, Serialize};
use tower::timeout::error::Elapsed;

use common::error::Error;
use common::models::{IrisFeatures, Prediction};
use common::types::ServiceState;
use model_manager::ModelMetadata;

use crate::error::ApiError;
use crate::state::AppState;

/// Body returned by `/health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` when ready, `not_ready` otherwise
    pub status: String,
}

/// Query parameters of `/predict/`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictParams {
    /// Include per-class probabilities in the response
    #[serde(default)]
    pub include_probabilities: bool,
}

/// Liveness/readiness probe
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.readiness.get() {
        ServiceState::Ready => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "ok".to_string(),
            }),
        ),
        ServiceState::NotReady => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: ServiceState::NotReady.to_string(),
            }),
        ),
    }
}

/// Classifies one feature vector
pub async fn predict(
    State(state): State<AppState>,
    params: Result<Query<PredictParams>, QueryRejection>,
    payload: Result<Json<IrisFeatures>, JsonRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let Query(params) = params?;
    let Json(features) = payload?;

    let prediction = state.engine.predict(&features, params.include_probabilities)?;

    Ok(Json(prediction))
}

/// Describes the loaded model
pub async fn model_info(State(state): State<AppState>) -> Json<ModelMetadata> {
    Json(state.engine.metadata().clone())
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    Error::NotFound(format!("No route for {}", uri.path())).into()
}

/// Fallback for a known route called with the wrong method
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "method_not_allowed",
        format!("{} is not supported on {}", method, uri.path()),
    )
}

/// Turns middleware failures into JSON error responses
pub async fn handle_middleware_error(err: BoxError) -> ApiError {
    if err.is::<Elapsed>() {
        ApiError::new(StatusCode::REQUEST_TIMEOUT, "timeout", "Request timed out")
    } else {
        Error::Internal(format!("Unhandled middleware error: {}", err)).into()
    }
}
