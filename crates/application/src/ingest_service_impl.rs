use std::sync::Arc;

use domain::auditlog::entity::{AuditLogEntry, ContentType};
use domain::auditlog::error::{IngestError, StorageError};
use domain::breaker::CircuitBreaker;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use ports::secondary::log_consumer::LogConsumer;
use ports::secondary::metrics_port::MetricsPort;

use crate::key_index::KeyIndexStore;

/// Delivery paths, used to label metrics and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPath {
    Ingest,
    Reprocess,
}

impl DeliveryPath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Reprocess => "reprocess",
        }
    }
}

/// Application service implementing the durable ingest contract:
/// persist the entry, attempt delivery under the circuit breaker, and
/// remove the entry only after the consumer acknowledged it.
pub struct IngestAppService {
    key_index: Arc<KeyIndexStore>,
    consumer: Arc<dyn LogConsumer>,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<dyn MetricsPort>,
}

impl IngestAppService {
    pub fn new(
        key_index: Arc<KeyIndexStore>,
        consumer: Arc<dyn LogConsumer>,
        breaker: Arc<CircuitBreaker>,
        metrics: Arc<dyn MetricsPort>,
    ) -> Self {
        Self {
            key_index,
            consumer,
            breaker,
            metrics,
        }
    }

    /// Persist a non-empty batch and attempt inline delivery.
    ///
    /// `canonical` holds the protobuf encoding of `request` (JSON ingests
    /// are re-encoded by the caller before this point). The entry is
    /// removed again only when the consumer acknowledges; a breaker
    /// rejection or consumer failure leaves it for the reprocessor, which
    /// is exactly the at-least-once contract.
    pub async fn ingest(
        &self,
        request: &ExportLogsServiceRequest,
        canonical: Vec<u8>,
    ) -> Result<(), IngestError> {
        let entry = AuditLogEntry::new(ContentType::Protobuf, canonical);
        let data = entry
            .to_bytes()
            .map_err(|e| StorageError::Codec(e.to_string()))?;

        self.key_index.add_entry(&entry.id, data).await?;
        self.metrics.record_persisted();
        tracing::debug!(key = %entry.id, "audit log entry persisted");

        self.deliver(request, DeliveryPath::Ingest).await?;

        // Consumer acknowledged: drop the entry and its index membership.
        // A failure here only means the reprocessor will redeliver once —
        // acceptable under at-least-once — so the ingest still succeeds.
        if let Err(e) = self.key_index.remove_entry(&entry.id).await {
            tracing::warn!(key = %entry.id, error = %e, "failed to remove delivered entry");
        }
        Ok(())
    }

    /// One delivery attempt through the circuit breaker.
    ///
    /// Records the outcome on the breaker and in metrics. Returns
    /// `BreakerOpen` without touching the consumer when attempts are
    /// currently rejected.
    pub async fn deliver(
        &self,
        request: &ExportLogsServiceRequest,
        path: DeliveryPath,
    ) -> Result<(), IngestError> {
        if !self.breaker.attempt_allowed() {
            self.metrics.record_delivery(path.as_str(), "deferred");
            self.metrics
                .record_circuit_state(self.breaker.state().as_u8());
            return Err(IngestError::BreakerOpen);
        }

        match self.consumer.consume_logs(request).await {
            Ok(()) => {
                self.breaker.on_success();
                self.metrics.record_delivery(path.as_str(), "success");
                self.metrics
                    .record_circuit_state(self.breaker.state().as_u8());
                Ok(())
            }
            Err(e) => {
                self.breaker.on_failure();
                self.metrics.record_delivery(path.as_str(), "failure");
                self.metrics
                    .record_circuit_state(self.breaker.state().as_u8());
                Err(e.into())
            }
        }
    }

    pub fn key_index(&self) -> &Arc<KeyIndexStore> {
        &self.key_index
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use opentelemetry_proto::tonic::common::v1::{AnyValue, any_value};
    use opentelemetry_proto::tonic::logs::v1::{LogRecord, ResourceLogs, ScopeLogs};
    use ports::secondary::kv_store::KvStore;
    use ports::test_utils::{FailingKv, MemoryKv, NoopMetrics, RecordingConsumer};
    use prost::Message;

    fn one_record_request(body: &str) -> ExportLogsServiceRequest {
        ExportLogsServiceRequest {
            resource_logs: vec![ResourceLogs {
                scope_logs: vec![ScopeLogs {
                    log_records: vec![LogRecord {
                        body: Some(AnyValue {
                            value: Some(any_value::Value::StringValue(body.to_string())),
                        }),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                ..Default::default()
            }],
        }
    }

    struct Harness {
        kv: Arc<MemoryKv>,
        consumer: Arc<RecordingConsumer>,
        service: IngestAppService,
    }

    fn harness(breaker: CircuitBreaker) -> Harness {
        let kv = Arc::new(MemoryKv::new());
        let consumer = Arc::new(RecordingConsumer::new());
        let key_index = Arc::new(KeyIndexStore::new(Arc::clone(&kv) as Arc<dyn KvStore>));
        let service = IngestAppService::new(
            key_index,
            Arc::clone(&consumer) as Arc<dyn LogConsumer>,
            Arc::new(breaker),
            Arc::new(NoopMetrics),
        );
        Harness {
            kv,
            consumer,
            service,
        }
    }

    fn default_breaker() -> CircuitBreaker {
        CircuitBreaker::new(true, 5, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn successful_ingest_delivers_once_and_leaves_storage_empty() {
        let h = harness(default_breaker());
        let request = one_record_request("hello");

        h.service
            .ingest(&request, request.encode_to_vec())
            .await
            .unwrap();

        assert!(h.kv.is_empty());
        let accepted = h.consumer.accepted();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0], request);
    }

    #[tokio::test]
    async fn consumer_failure_leaves_entry_persisted() {
        let h = harness(default_breaker());
        h.consumer.fail_next(1);
        let request = one_record_request("hello");

        let err = h
            .service
            .ingest(&request, request.encode_to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Consumer(_)));

        // One entry blob plus the keys list.
        assert_eq!(h.kv.len(), 2);
        let keys = h.service.key_index().list().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert!(h.kv.contains(&keys[0]));
    }

    #[tokio::test]
    async fn persisted_entry_replays_through_canonical_decoder() {
        let h = harness(default_breaker());
        h.consumer.fail_next(1);
        let request = one_record_request("durable");
        h.service
            .ingest(&request, request.encode_to_vec())
            .await
            .unwrap_err();

        let keys = h.service.key_index().list().await.unwrap();
        let blob = h.kv.raw_get(&keys[0]).unwrap();
        let entry = AuditLogEntry::from_bytes(&blob).unwrap();
        assert_eq!(entry.content_type, ContentType::Protobuf);
        let decoded = ExportLogsServiceRequest::decode(entry.body.as_slice()).unwrap();
        assert_eq!(decoded, request);
    }

    #[tokio::test]
    async fn open_breaker_defers_without_consumer_call() {
        let breaker = CircuitBreaker::new(true, 1, Duration::from_secs(3600));
        breaker.on_failure();
        let h = harness(breaker);
        let request = one_record_request("deferred");

        let err = h
            .service
            .ingest(&request, request.encode_to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::BreakerOpen));
        assert_eq!(h.consumer.calls(), 0);
        // Entry stays for the reprocessor.
        assert_eq!(h.service.key_index().pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn breaker_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(true, 3, Duration::from_secs(3600));
        let h = harness(breaker);
        h.consumer.fail_next(10);
        let request = one_record_request("x");

        for _ in 0..3 {
            let err = h
                .service
                .ingest(&request, request.encode_to_vec())
                .await
                .unwrap_err();
            assert!(matches!(err, IngestError::Consumer(_)));
        }

        // Threshold reached: fourth ingest persists but never reaches the
        // consumer.
        let err = h
            .service
            .ingest(&request, request.encode_to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::BreakerOpen));
        assert_eq!(h.consumer.calls(), 3);
        assert_eq!(h.service.key_index().pending_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn persistence_failure_surfaces_storage_error() {
        let consumer = Arc::new(RecordingConsumer::new());
        let key_index = Arc::new(KeyIndexStore::new(Arc::new(FailingKv) as Arc<dyn KvStore>));
        let service = IngestAppService::new(
            key_index,
            Arc::clone(&consumer) as Arc<dyn LogConsumer>,
            Arc::new(default_breaker()),
            Arc::new(NoopMetrics),
        );
        let request = one_record_request("x");

        let err = service
            .ingest(&request, request.encode_to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Storage(_)));
        // The consumer must never see a batch that was not persisted first.
        assert_eq!(consumer.calls(), 0);
    }
}
