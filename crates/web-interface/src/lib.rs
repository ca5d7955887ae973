//! HTTP interface for the iris inference service
//!
//! This crate exposes the loaded classifier over HTTP:
//!
//! - `GET /health`: readiness/liveness probe
//! - `POST /predict/`: classify one feature vector
//! - `GET /model`: describe the loaded artifact

pub mod error;
pub mod handlers;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info;

use common::error::{Error, Result};
use common::types::ServiceState;
use inference_engine::InferenceEngine;
use service_config::ServiceConfig;

pub use error::{ApiError, ErrorBody};
pub use handlers::{HealthResponse, PredictParams};
pub use state::{AppState, Readiness};

/// Builds the service router
pub fn router(state: AppState, request_timeout: Duration, max_body_bytes: usize) -> Router {
    Router::new()
        .route(
            "/health",
            get(handlers::health).fallback(handlers::method_not_allowed),
        )
        .route(
            "/predict/",
            post(handlers::predict).fallback(handlers::method_not_allowed),
        )
        .route(
            "/predict",
            post(handlers::predict).fallback(handlers::method_not_allowed),
        )
        .route(
            "/model",
            get(handlers::model_info).fallback(handlers::method_not_allowed),
        )
        .fallback(handlers::not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handlers::handle_middleware_error))
                .timeout(request_timeout),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// HTTP front end of one replica
pub struct WebInterface {
    /// Listen address
    address: SocketAddr,

    /// Per-request timeout
    request_timeout: Duration,

    /// Maximum request body size in bytes
    max_body_bytes: usize,

    /// Handler state
    state: AppState,
}

impl WebInterface {
    /// Creates a web interface serving `engine`
    pub fn new(
        config: &ServiceConfig,
        engine: Arc<InferenceEngine>,
        readiness: Arc<Readiness>,
    ) -> Result<Self> {
        Ok(Self {
            address: config.socket_addr()?,
            request_timeout: config.request_timeout(),
            max_body_bytes: config.max_body_bytes,
            state: AppState::new(engine, readiness),
        })
    }

    /// Gets the configured listen address
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Gets the router this interface serves
    pub fn router(&self) -> Router {
        router(self.state.clone(), self.request_timeout, self.max_body_bytes)
    }

    /// Binds the listener, marks the replica ready and serves until `shutdown` resolves
    ///
    /// The replica reports `NotReady` as soon as shutdown begins, while
    /// in-flight requests drain.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let server = axum::Server::try_bind(&self.address)
            .map_err(|e| Error::Internal(format!("Failed to bind {}: {}", self.address, e)))?;

        let readiness = self.state.readiness.clone();
        let app = self.router();

        info!("Listening on http://{}", self.address);
        readiness.set(ServiceState::Ready);

        let draining = readiness.clone();
        server
            .serve(app.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown.await;
                draining.set(ServiceState::NotReady);
                info!("Shutdown requested, draining in-flight requests");
            })
            .await
            .map_err(|e| Error::Internal(format!("Server error: {}", e)))?;

        readiness.set(ServiceState::NotReady);
        info!("Web interface stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use model_manager::{LoadedModel, ModelArtifact};

    const SHIPPED_ARTIFACT: &str =
        concat!(env!("CARGO_MANIFEST_DIR"), "/../../models/iris_classifier.json");

    fn test_state(state: ServiceState) -> AppState {
        let bytes = std::fs::read(SHIPPED_ARTIFACT).unwrap();
        let artifact = ModelArtifact::from_slice(&bytes).unwrap();
        let model = LoadedModel::from_artifact(artifact, Path::new(SHIPPED_ARTIFACT), &bytes).unwrap();
        let engine = InferenceEngine::new(Arc::new(model)).unwrap();

        let readiness = Readiness::new();
        readiness.set(state);
        AppState::new(Arc::new(engine), Arc::new(readiness))
    }

    fn test_router() -> Router {
        router(test_state(ServiceState::Ready), Duration::from_secs(5), 1024)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_when_ready() {
        let (status, body) = send(test_router(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_health_when_not_ready() {
        let app = router(test_state(ServiceState::NotReady), Duration::from_secs(5), 1024);
        let (status, body) = send(app, get("/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, json!({"status": "not_ready"}));
    }

    #[tokio::test]
    async fn test_predict_setosa() {
        let payload = r#"{"sepal_length":5.1,"sepal_width":3.5,"petal_length":1.4,"petal_width":0.2}"#;
        let (status, body) = send(test_router(), post_json("/predict/", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"prediction": "setosa", "class_index": 0}));
    }

    #[tokio::test]
    async fn test_predict_without_trailing_slash() {
        let payload = r#"{"sepal_length":6.7,"sepal_width":3.0,"petal_length":5.2,"petal_width":2.3}"#;
        let (status, body) = send(test_router(), post_json("/predict", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "virginica");
    }

    #[tokio::test]
    async fn test_predict_with_probabilities() {
        let payload = r#"{"sepal_length":5.9,"sepal_width":3.0,"petal_length":4.2,"petal_width":1.5}"#;
        let (status, body) = send(
            test_router(),
            post_json("/predict/?include_probabilities=true", payload),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "versicolor");

        let probabilities = body["probabilities"].as_object().unwrap();
        assert_eq!(probabilities.len(), 3);
        let total: f64 = probabilities.values().map(|p| p.as_f64().unwrap()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_predict_string_field_is_422() {
        let payload = r#"{"sepal_length":"abc","sepal_width":3.5,"petal_length":1.4,"petal_width":0.2}"#;
        let (status, body) = send(test_router(), post_json("/predict/", payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_predict_missing_field_is_422() {
        let payload = r#"{"sepal_length":5.1,"sepal_width":3.5,"petal_length":1.4}"#;
        let (status, body) = send(test_router(), post_json("/predict/", payload)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("petal_width"));
    }

    #[tokio::test]
    async fn test_predict_malformed_json_is_400() {
        let (status, body) = send(test_router(), post_json("/predict/", "{\"sepal_length\": 5.1,")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "malformed_json");
    }

    #[tokio::test]
    async fn test_predict_requires_json_content_type() {
        let request = Request::builder()
            .method("POST")
            .uri("/predict/")
            .body(Body::from("sepal_length=5.1"))
            .unwrap();
        let (status, _) = send(test_router(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_predict_rejects_oversized_body() {
        let padding = " ".repeat(2048);
        let payload = format!(
            r#"{{"sepal_length":5.1,"sepal_width":3.5,"petal_length":1.4,"petal_width":0.2}}{}"#,
            padding
        );
        let (status, _) = send(test_router(), post_json("/predict/", &payload)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_service_survives_bad_requests() {
        let app = test_router();

        let bad = post_json("/predict/", r#"{"sepal_length":null}"#);
        let (status, _) = send(app.clone(), bad).await;
        assert!(status.is_client_error());

        let good = post_json(
            "/predict/",
            r#"{"sepal_length":5.1,"sepal_width":3.5,"petal_length":1.4,"petal_width":0.2}"#,
        );
        let (status, _) = send(app, good).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_extreme_finite_values() {
        let payload = r#"{"sepal_length":1.0,"sepal_width":1.0,"petal_length":1e308,"petal_width":-1e308}"#;
        let (status, body) = send(test_router(), post_json("/predict/", payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["prediction"], "versicolor");
    }

    #[tokio::test]
    async fn test_wrong_method_is_json_405() {
        let (status, body) = send(test_router(), get("/predict/")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["error"], "method_not_allowed");

        let (status, body) = send(test_router(), post_json("/health", "{}")).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert!(body["detail"].as_str().unwrap().contains("POST"));
    }

    #[tokio::test]
    async fn test_timeout_is_json_408() {
        let err = handlers::handle_middleware_error(Box::new(tower::timeout::error::Elapsed::new())).await;
        assert_eq!(err.status(), StatusCode::REQUEST_TIMEOUT);

        let response = axum::response::IntoResponse::into_response(err);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "timeout");
    }

    #[tokio::test]
    async fn test_other_middleware_errors_are_500() {
        let err = handlers::handle_middleware_error("boom".into()).await;
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_model_info() {
        let (status, body) = send(test_router(), get("/model")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["estimator"], "logistic_regression");
        assert_eq!(body["classes"], json!(["setosa", "versicolor", "virginica"]));
        assert_eq!(body["feature_names"][3], "petal_width");
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (status, body) = send(test_router(), get("/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn test_serve_reports_ready_then_drains() {
        let state = test_state(ServiceState::NotReady);
        let readiness = state.readiness.clone();
        let interface = WebInterface {
            address: "127.0.0.1:0".parse().unwrap(),
            request_timeout: Duration::from_secs(5),
            max_body_bytes: 1024,
            state,
        };

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(interface.serve(async move {
            let _ = stop_rx.await;
        }));

        for _ in 0..50 {
            if readiness.is_ready() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(readiness.is_ready());

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(!readiness.is_ready());
    }
}
