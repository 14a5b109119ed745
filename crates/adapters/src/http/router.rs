use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use infrastructure::constants::MAX_BODY_SIZE;

use super::health_handler::{healthz, readyz};
use super::logs_handler::export_logs;
use super::metrics_handler::metrics;
use super::openapi::openapi_json;
use super::state::AppState;

/// Build the Axum router.
///
/// The three ingest routes share one handler: `/v1/logs` and the
/// trailing-slash and `/export` spellings that OTLP clients use. Anything
/// but POST on them is a 405. Health, metrics, and the OpenAPI document
/// sit next to them unauthenticated.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/logs", post(export_logs))
        .route("/v1/logs/", post(export_logs))
        .route("/v1/logs/export", post(export_logs))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}
