//! HTTP API.
//!
//! Serves the recommendation, risk, yield and historical endpoints plus
//! liveness and Prometheus metrics. Every request runs its own computation;
//! the only shared value is the immutable [`AllocationService`].

use crate::config::ServerConfig;
use crate::engine::{AllocationService, HistoricalYields, Recommendation, RiskReport, YieldSnapshot};
use crate::utils::error::{Error, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info, warn};
use metrics::increment_counter;
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

pub const SERVICE_NAME: &str = "AI Yield Allocation Service";

#[derive(Clone)]
pub struct AppState {
    service: Arc<AllocationService>,
}

/// Error response: `{"detail": "..."}` with 400 for caller mistakes, 500 otherwise.
#[derive(Debug)]
pub struct ApiError {
    context: &'static str,
    error: Error,
}

impl ApiError {
    fn new(context: &'static str, error: Error) -> Self {
        Self { context, error }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = if self.error.is_client_error() {
            (StatusCode::BAD_REQUEST, self.error.to_string())
        } else {
            error!("{}: {}", self.context, self.error);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{}: {}", self.context, self.error))
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn track<T>(
    endpoint: &'static str, result: Result<T>, context: &'static str,
) -> std::result::Result<Json<T>, ApiError> {
    increment_counter!(crate::metrics::HTTP_REQUESTS, "endpoint" => endpoint);
    result.map(Json).map_err(|e| {
        increment_counter!(crate::metrics::HTTP_ERRORS, "endpoint" => endpoint);
        ApiError::new(context, e)
    })
}

// --- Handlers ---

async fn root_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "online",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "predictor": state.service.predictor_name(),
    }))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn recommendation_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<Recommendation>, ApiError> {
    track("recommendation", state.service.recommend(), "Error generating recommendation")
}

async fn risk_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<RiskReport>, ApiError> {
    track("risk", state.service.risk_report(), "Error analyzing risk")
}

async fn yields_handler(
    State(state): State<AppState>,
) -> std::result::Result<Json<YieldSnapshot>, ApiError> {
    track("yields", state.service.yields(), "Error predicting yields")
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    days: Option<u32>,
}

async fn historical_handler(
    State(state): State<AppState>, Path(protocol): Path<String>, Query(params): Query<HistoryParams>,
) -> std::result::Result<Json<HistoricalYields>, ApiError> {
    track(
        "historical",
        state.service.history(&protocol, params.days),
        "Error fetching historical yields",
    )
}

async fn metrics_handler() -> String {
    crate::metrics::render()
}

/// Build the API router.
pub fn router(service: Arc<AllocationService>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/recommendation", get(recommendation_handler))
        .route("/risk", get(risk_handler))
        .route("/yields", get(yields_handler))
        .route("/historical/:protocol", get(historical_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { service })
}

/// Bind the configured address, optionally falling back to an ephemeral port.
pub fn bind(config: &ServerConfig) -> Result<TcpListener> {
    let addr = format!("{}:{}", config.host, config.port);
    match TcpListener::bind(&addr) {
        | Ok(l) => Ok(l),
        | Err(e) if config.fallback_to_random_port => {
            warn!("{} unavailable ({}), binding to random port", addr, e);
            Ok(TcpListener::bind(format!("{}:0", config.host))?)
        }
        | Err(e) => Err(Error::IoError(e)),
    }
}

/// Serve the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener, service: Arc<AllocationService>, shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr: SocketAddr = listener.local_addr()?;
    info!("{} listening on http://{}", SERVICE_NAME, local_addr);

    axum::Server::from_tcp(listener)
        .map_err(|e| Error::Other(format!("failed to create server from listener: {}", e)))?
        .serve(router(service).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| Error::Other(format!("server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let resp = ApiError::new(
            "Error fetching historical yields",
            Error::UnknownProtocol { given: "x".into(), valid: "Aave".into() },
        )
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_internal_errors_map_to_server_error() {
        let resp = ApiError::new("Error generating recommendation", Error::PredictorError("x".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_bind_falls_back_to_random_port() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let mut config = ServerConfig { host: "127.0.0.1".into(), port, fallback_to_random_port: false };
        assert!(bind(&config).is_err());

        config.fallback_to_random_port = true;
        let listener = bind(&config).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), port);
    }
}
