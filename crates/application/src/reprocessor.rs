use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use domain::auditlog::entity::AuditLogEntry;
use domain::auditlog::error::IngestError;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use ports::secondary::metrics_port::MetricsPort;
use prost::Message;
use tokio_util::sync::CancellationToken;

use crate::ingest_service_impl::{DeliveryPath, IngestAppService};

/// Background drainer of aged, undelivered entries.
///
/// Wakes every `interval`, walks the key index in stored order and
/// redelivers every entry older than `age_threshold`. Young entries are
/// skipped so the loop never races an in-flight inline attempt. Delivery
/// runs on a fresh context — it must not be tied to any request's
/// lifetime.
pub struct Reprocessor {
    service: Arc<IngestAppService>,
    metrics: Arc<dyn MetricsPort>,
    interval: Duration,
    age_threshold: Duration,
}

impl Reprocessor {
    pub fn new(
        service: Arc<IngestAppService>,
        metrics: Arc<dyn MetricsPort>,
        interval: Duration,
        age_threshold: Duration,
    ) -> Self {
        Self {
            service,
            metrics,
            interval,
            age_threshold,
        }
    }

    /// Run until `cancel` fires. Cancellation is observed between entries,
    /// so shutdown latency is bounded by one in-flight consumer call.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick of a tokio interval completes immediately; consume
        // it so the loop matches a plain periodic timer.
        ticker.tick().await;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("stopping audit log reprocessor");
                    return;
                }
                _ = ticker.tick() => {
                    self.process_stored_entries(&cancel).await;
                }
            }
        }
    }

    /// One reprocessing pass over the key index.
    pub async fn process_stored_entries(&self, cancel: &CancellationToken) {
        let keys = match self.service.key_index().list().await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::error!(error = %e, "failed to list stored entry keys");
                return;
            }
        };
        if keys.is_empty() {
            self.metrics.set_pending_entries(0);
            return;
        }

        tracing::debug!(count = keys.len(), "reprocessing stored audit logs");
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.age_threshold)
                .unwrap_or_else(|_| chrono::Duration::seconds(30));

        for key in keys {
            if cancel.is_cancelled() {
                return;
            }
            self.process_entry(&key, cutoff).await;
        }

        match self.service.key_index().pending_count().await {
            Ok(count) => self.metrics.set_pending_entries(count as i64),
            Err(e) => tracing::debug!(error = %e, "failed to read pending entry count"),
        }
    }

    async fn process_entry(&self, key: &str, cutoff: chrono::DateTime<Utc>) {
        let data = match self.service.key_index().get(key).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                // Ghost key: indexed but the blob is gone (a concurrent
                // delivery won the race). Converge the index.
                tracing::debug!(key, "removing ghost key from index");
                self.metrics.record_ghost_removed();
                if let Err(e) = self.service.key_index().remove_entry(key).await {
                    tracing::error!(key, error = %e, "failed to remove ghost key");
                }
                return;
            }
            Err(e) => {
                tracing::error!(key, error = %e, "failed to load stored entry");
                return;
            }
        };

        let entry = match AuditLogEntry::from_bytes(&data) {
            Ok(entry) => entry,
            Err(e) => {
                // Permanent: the blob no longer decodes. Leave it for an
                // operator rather than deleting audit data.
                tracing::error!(key, error = %e, "stored entry does not decode, skipping");
                return;
            }
        };

        if entry.timestamp > cutoff {
            tracing::debug!(key, "entry younger than age threshold, skipping");
            return;
        }

        let request = match ExportLogsServiceRequest::decode(entry.body.as_slice()) {
            Ok(request) => request,
            Err(e) => {
                tracing::error!(key, error = %e, "stored payload is not valid OTLP, skipping");
                return;
            }
        };

        match self.service.deliver(&request, DeliveryPath::Reprocess).await {
            Ok(()) => {
                if let Err(e) = self.service.key_index().remove_entry(key).await {
                    tracing::error!(key, error = %e, "failed to remove delivered entry");
                    return;
                }
                tracing::info!(key, "stored audit log delivered and removed");
            }
            Err(IngestError::BreakerOpen) => {
                tracing::debug!(key, "circuit breaker open, deferring entry");
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "redelivery failed, will retry next tick");
            }
        }
    }
}
