use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use domain::auditlog::entity::ContentType;
use opentelemetry_proto::tonic::collector::logs::v1::{
    ExportLogsServiceRequest, ExportLogsServiceResponse,
};
use ports::secondary::log_consumer::log_record_count;
use ports::secondary::metrics_port::MetricsPort;
use prost::Message;

use super::error::ApiError;
use super::state::AppState;

/// `POST /v1/logs` (also `/v1/logs/` and `/v1/logs/export`) — OTLP logs
/// ingest with durable persistence.
///
/// The batch is persisted before the inline delivery attempt, so a `500`
/// or `503` response still means the entry will be redelivered by the
/// background reprocessor. `200` means the consumer acknowledged the
/// batch and the entry is gone.
#[utoipa::path(
    post, path = "/v1/logs",
    tag = "Ingest",
    request_body(content = String, content_type = "application/x-protobuf",
        description = "OTLP ExportLogsServiceRequest, protobuf or JSON encoded"),
    responses(
        (status = 200, description = "Batch delivered; empty ExportLogsServiceResponse"),
        (status = 400, description = "Unknown content type or malformed body"),
        (status = 500, description = "Storage failure, or consumer failure after persistence"),
        (status = 503, description = "Circuit breaker open; batch persisted for retry"),
    )
)]
pub async fn export_logs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let content_type = match headers.get(header::CONTENT_TYPE) {
        Some(value) => {
            let value = value.to_str().unwrap_or_default();
            ContentType::from_header(value)
                .ok_or_else(|| ApiError::unsupported_content_type(value))?
        }
        None => return Err(ApiError::unsupported_content_type("")),
    };

    // An over-limit or interrupted body read is a client problem, not a
    // server one.
    let body = body.map_err(|e| ApiError::bad_payload(format!("failed to read body: {e}")))?;

    if content_type.is_protobuf() {
        handle_protobuf(&state, body).await
    } else {
        handle_json(&state, &body).await
    }
}

async fn handle_protobuf(state: &Arc<AppState>, body: Bytes) -> Result<Response, ApiError> {
    let request = ExportLogsServiceRequest::decode(body.as_ref())
        .map_err(|e| ApiError::bad_payload(format!("invalid OTLP protobuf: {e}")))?;

    let records = log_record_count(&request);
    state
        .metrics
        .record_received(ContentType::Protobuf.as_str(), records as u64);

    if records == 0 {
        return Ok(protobuf_response());
    }

    state.ingest.ingest(&request, body.to_vec()).await?;
    Ok(protobuf_response())
}

async fn handle_json(state: &Arc<AppState>, body: &[u8]) -> Result<Response, ApiError> {
    let request: ExportLogsServiceRequest = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_payload(format!("invalid OTLP JSON: {e}")))?;

    let records = log_record_count(&request);
    state
        .metrics
        .record_received(ContentType::Json.as_str(), records as u64);

    if records == 0 {
        return json_response();
    }

    // Re-encode to the canonical protobuf form so replay needs only one
    // decoder path; the stored content type becomes protobuf.
    let canonical = request.encode_to_vec();
    state.ingest.ingest(&request, canonical).await?;
    json_response()
}

/// Canonical empty OTLP response, protobuf encoded.
fn protobuf_response() -> Response {
    (
        [(header::CONTENT_TYPE, ContentType::Protobuf.as_str())],
        ExportLogsServiceResponse::default().encode_to_vec(),
    )
        .into_response()
}

/// Canonical empty OTLP response, JSON encoded.
fn json_response() -> Result<Response, ApiError> {
    let body = serde_json::to_vec(&ExportLogsServiceResponse::default()).map_err(|e| {
        ApiError::Internal {
            message: format!("failed to encode response: {e}"),
        }
    })?;
    Ok((
        [(header::CONTENT_TYPE, ContentType::Json.as_str())],
        body,
    )
        .into_response())
}
