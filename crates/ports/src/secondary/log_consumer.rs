use std::future::Future;
use std::pin::Pin;

use domain::auditlog::error::ConsumerError;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;

/// Secondary port for the downstream log consumer.
///
/// The consumer accepts one OTLP logs batch per call. A returned error is
/// transient from the receiver's point of view: the entry stays persisted
/// and the reprocessor retries it, so implementations must not be called
/// for side effects they cannot tolerate seeing at least once.
///
/// Uses `Pin<Box<dyn Future>>` return type (instead of RPITIT) so the
/// trait is dyn-compatible and can be used as `Arc<dyn LogConsumer>`.
pub trait LogConsumer: Send + Sync {
    fn consume_logs<'a>(
        &'a self,
        request: &'a ExportLogsServiceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + 'a>>;
}

/// Count the log records across all resource/scope groupings of a batch.
pub fn log_record_count(request: &ExportLogsServiceRequest) -> usize {
    request
        .resource_logs
        .iter()
        .flat_map(|r| r.scope_logs.iter())
        .map(|s| s.log_records.len())
        .sum()
}
