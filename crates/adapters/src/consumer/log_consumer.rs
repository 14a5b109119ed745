use std::future::Future;
use std::pin::Pin;

use domain::auditlog::error::ConsumerError;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value;
use ports::secondary::log_consumer::{LogConsumer, log_record_count};

/// Consumer that emits each batch to the receiver's own structured log.
///
/// The default when no upstream is configured; handy for development and
/// for smoke-testing the durable path end to end.
pub struct LogSinkConsumer;

impl LogConsumer for LogSinkConsumer {
    fn consume_logs<'a>(
        &'a self,
        request: &'a ExportLogsServiceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + 'a>> {
        Box::pin(async move {
            for resource in &request.resource_logs {
                for scope in &resource.scope_logs {
                    for record in &scope.log_records {
                        let body = record.body.as_ref().and_then(|b| b.value.as_ref());
                        let body_text = match body {
                            Some(any_value::Value::StringValue(s)) => s.clone(),
                            Some(other) => format!("{other:?}"),
                            None => String::new(),
                        };
                        tracing::info!(
                            severity = %record.severity_text,
                            timestamp_ns = record.time_unix_nano,
                            body = %body_text,
                            "audit log record"
                        );
                    }
                }
            }
            tracing::debug!(records = log_record_count(request), "batch consumed");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_proto::tonic::common::v1::AnyValue;
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};

    #[tokio::test]
    async fn accepts_any_batch() {
        let consumer = LogSinkConsumer;
        let request = ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                scope_logs: vec![ScopeLogs {
                    log_records: vec![LogRecord {
                        body: Some(AnyValue {
                            value: Some(any_value::Value::StringValue("hello".to_string())),
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        };
        assert!(consumer.consume_logs(&request).await.is_ok());
        assert!(
            consumer
                .consume_logs(&ExportLogsServiceRequest::default())
                .await
                .is_ok()
        );
    }
}
