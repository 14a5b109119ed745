use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use utoipa::ToSchema;

use super::state::AppState;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `"ok"`.
    #[schema(value_type = String)]
    pub status: &'static str,
}

#[derive(Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Always `"ready"` once the server is up (storage is resolved before
    /// the listener starts).
    #[schema(value_type = String)]
    pub status: &'static str,
    /// Current circuit breaker state (`closed`, `half_open`, `open`).
    #[schema(value_type = String)]
    pub circuit_breaker: &'static str,
    /// Receiver version.
    pub version: String,
    /// Seconds since start.
    pub uptime_secs: u64,
}

/// Liveness probe — always returns 200 if the process is running.
#[utoipa::path(
    get, path = "/healthz",
    tag = "Health",
    responses(
        (status = 200, description = "Receiver is alive", body = HealthResponse),
    )
)]
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Readiness probe. Storage is acquired before the listener binds, so a
/// responding server is a ready server; the body carries the breaker
/// state for operators.
#[utoipa::path(
    get, path = "/readyz",
    tag = "Health",
    responses(
        (status = 200, description = "Receiver is ready", body = ReadyResponse),
    )
)]
pub async fn readyz(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    Json(ReadyResponse {
        status: "ready",
        circuit_breaker: state.ingest.breaker().state().as_str(),
        version: state.version.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
