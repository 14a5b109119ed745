use std::future::Future;
use std::pin::Pin;

use application::retry::{RetryPolicy, with_retries};
use domain::auditlog::error::ConsumerError;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use ports::secondary::log_consumer::LogConsumer;
use prost::Message;

/// Consumer that forwards each batch to an upstream OTLP/HTTP logs
/// endpoint as protobuf.
///
/// Transport hiccups are retried with backoff; a still-failing batch
/// surfaces as a `ConsumerError` so the circuit breaker and the
/// reprocessor take over.
pub struct OtlpHttpConsumer {
    client: reqwest::Client,
    endpoint: String,
    auth_header: Option<String>,
    retry: RetryPolicy,
}

impl OtlpHttpConsumer {
    pub fn new(endpoint: String, auth_header: Option<String>, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            auth_header,
            retry,
        }
    }

    async fn post_once(&self, payload: &[u8]) -> Result<(), ConsumerError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/x-protobuf")
            .body(payload.to_vec());
        if let Some(auth) = &self.auth_header {
            request = request.header("Authorization", auth.clone());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ConsumerError(format!("OTLP export POST failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ConsumerError(format!(
                "OTLP export rejected with status {status}"
            )))
        }
    }
}

impl LogConsumer for OtlpHttpConsumer {
    fn consume_logs<'a>(
        &'a self,
        request: &'a ExportLogsServiceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = request.encode_to_vec();
            let result = with_retries(&self.retry, || self.post_once(&payload)).await;
            if let Err(e) = &result {
                tracing::warn!(endpoint = %self.endpoint, error = %e, "OTLP export failed");
            }
            result
        })
    }
}
