use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::auditlog::error::IngestError;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub(crate) struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize, ToSchema)]
pub(crate) struct ErrorDetail {
    /// Machine-readable error code (e.g. `BAD_PAYLOAD`).
    #[schema(value_type = String)]
    code: &'static str,
    /// Human-readable description of the error.
    message: String,
}

/// Standard API error type.
///
/// All variants produce a JSON response matching:
/// `{"error":{"code":"SCREAMING_SNAKE","message":"human-readable"}}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: &'static str, message: String },
    Internal { message: String },
    ServiceUnavailable { message: String },
}

impl ApiError {
    pub fn bad_payload(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "BAD_PAYLOAD",
            message: message.into(),
        }
    }

    pub fn unsupported_content_type(value: &str) -> Self {
        Self::BadRequest {
            code: "UNSUPPORTED_CONTENT_TYPE",
            message: format!(
                "unsupported content type {value:?}, expected application/x-protobuf, \
                 application/vnd.google.protobuf, or application/json"
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            Self::Internal { message } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
            }
            Self::ServiceUnavailable { message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                message,
            ),
        };

        (
            status,
            Json(ErrorBody {
                error: ErrorDetail { code, message },
            }),
        )
            .into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match &err {
            IngestError::BadPayload(_) => Self::bad_payload(err.to_string()),
            // Storage and consumer details stay in the logs; clients get a
            // generic server error.
            IngestError::Storage(_) => Self::Internal {
                message: "failed to persist audit log entry".to_string(),
            },
            IngestError::Consumer(_) => Self::Internal {
                message: "downstream consumer rejected the batch".to_string(),
            },
            IngestError::BreakerOpen => Self::ServiceUnavailable {
                message: "delivery temporarily suspended, entry persisted for retry".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::auditlog::error::{ConsumerError, StorageError};
    use http_body_util::BodyExt;

    async fn response_body(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn bad_payload_maps_to_400() {
        let err = ApiError::from(IngestError::BadPayload("trailing garbage".to_string()));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = response_body(resp).await;
        assert_eq!(body["error"]["code"], "BAD_PAYLOAD");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("trailing garbage")
        );
    }

    #[tokio::test]
    async fn storage_error_maps_to_500_with_generic_message() {
        let err = ApiError::from(IngestError::from(StorageError::Backend(
            "redb txn failed".to_string(),
        )));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response_body(resp).await;
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        // Backend detail must not leak to clients.
        assert!(!body["error"]["message"].as_str().unwrap().contains("redb"));
    }

    #[tokio::test]
    async fn consumer_error_maps_to_500() {
        let err = ApiError::from(IngestError::from(ConsumerError("boom".to_string())));
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn breaker_open_maps_to_503() {
        let err = ApiError::from(IngestError::BreakerOpen);
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = response_body(resp).await;
        assert_eq!(body["error"]["code"], "SERVICE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn unsupported_content_type_names_accepted_values() {
        let resp = ApiError::unsupported_content_type("text/plain").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = response_body(resp).await;
        assert_eq!(body["error"]["code"], "UNSUPPORTED_CONTENT_TYPE");
        assert!(
            body["error"]["message"]
                .as_str()
                .unwrap()
                .contains("application/x-protobuf")
        );
    }
}
