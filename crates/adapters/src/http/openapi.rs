use axum::Json;
use utoipa::OpenApi;

use super::error::{ErrorBody, ErrorDetail};
use super::health_handler::{HealthResponse, ReadyResponse};

/// OpenAPI document for the receiver's HTTP surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Audit Log Receiver API",
        description = "Durable OTLP logs ingest with at-least-once delivery"
    ),
    paths(
        super::logs_handler::export_logs,
        super::health_handler::healthz,
        super::health_handler::readyz,
        super::metrics_handler::metrics,
    ),
    components(schemas(ErrorBody, ErrorDetail, HealthResponse, ReadyResponse))
)]
pub struct ApiDoc;

/// `GET /api-docs/openapi.json` — machine-readable API description.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
