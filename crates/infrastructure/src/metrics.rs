use ports::secondary::metrics_port::MetricsPort;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

// ── Label types ─────────────────────────────────────────────────────

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EncodingLabels {
    pub encoding: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct DeliveryLabels {
    pub path: String,
    pub outcome: String,
}

// ── Receiver metrics registry ───────────────────────────────────────

/// Prometheus metrics for the receiver.
///
/// All metric families use interior mutability, so recording only needs
/// `&self`. The registry itself is not `Clone` — wrap in `Arc` to share
/// across tasks.
pub struct ReceiverMetrics {
    registry: Registry,
    pub log_batches_received_total: Family<EncodingLabels, Counter>,
    pub log_records_received_total: Counter,
    pub entries_persisted_total: Counter,
    pub deliveries_total: Family<DeliveryLabels, Counter>,
    pub ghost_keys_removed_total: Counter,
    pub circuit_breaker_state: Gauge,
    pub pending_entries: Gauge,
}

impl ReceiverMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("auditlog_receiver");

        let log_batches_received_total = Family::<EncodingLabels, Counter>::default();
        registry.register(
            "log_batches_received",
            "OTLP log batches accepted on the ingest endpoint by encoding",
            log_batches_received_total.clone(),
        );

        let log_records_received_total = Counter::default();
        registry.register(
            "log_records_received",
            "Individual log records accepted on the ingest endpoint",
            log_records_received_total.clone(),
        );

        let entries_persisted_total = Counter::default();
        registry.register(
            "entries_persisted",
            "Audit log entries durably written to storage",
            entries_persisted_total.clone(),
        );

        let deliveries_total = Family::<DeliveryLabels, Counter>::default();
        registry.register(
            "deliveries",
            "Delivery attempts by path (ingest/reprocess) and outcome",
            deliveries_total.clone(),
        );

        let ghost_keys_removed_total = Counter::default();
        registry.register(
            "ghost_keys_removed",
            "Index keys removed because their entry blob was gone",
            ghost_keys_removed_total.clone(),
        );

        let circuit_breaker_state = Gauge::default();
        registry.register(
            "circuit_breaker_state",
            "Circuit breaker state (0=closed, 1=half-open, 2=open)",
            circuit_breaker_state.clone(),
        );

        let pending_entries = Gauge::default();
        registry.register(
            "pending_entries",
            "Entries currently persisted and awaiting redelivery",
            pending_entries.clone(),
        );

        Self {
            registry,
            log_batches_received_total,
            log_records_received_total,
            entries_persisted_total,
            deliveries_total,
            ghost_keys_removed_total,
            circuit_breaker_state,
            pending_entries,
        }
    }

    /// Encode the registry in OpenMetrics text format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        if let Err(e) = encode(&mut buf, &self.registry) {
            tracing::error!(error = %e, "failed to encode metrics");
        }
        buf
    }
}

impl Default for ReceiverMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsPort for ReceiverMetrics {
    fn record_received(&self, encoding: &str, records: u64) {
        self.log_batches_received_total
            .get_or_create(&EncodingLabels {
                encoding: encoding.to_string(),
            })
            .inc();
        self.log_records_received_total.inc_by(records);
    }

    fn record_persisted(&self) {
        self.entries_persisted_total.inc();
    }

    fn record_delivery(&self, path: &str, outcome: &str) {
        self.deliveries_total
            .get_or_create(&DeliveryLabels {
                path: path.to_string(),
                outcome: outcome.to_string(),
            })
            .inc();
    }

    fn record_ghost_removed(&self) {
        self.ghost_keys_removed_total.inc();
    }

    fn record_circuit_state(&self, state: u8) {
        self.circuit_breaker_state.set(i64::from(state));
    }

    fn set_pending_entries(&self, count: i64) {
        self.pending_entries.set(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_metrics_appear_in_exposition() {
        let metrics = ReceiverMetrics::new();
        metrics.record_received("protobuf", 3);
        metrics.record_persisted();
        metrics.record_delivery("ingest", "success");
        metrics.record_ghost_removed();
        metrics.record_circuit_state(2);
        metrics.set_pending_entries(4);

        let text = metrics.encode();
        assert!(text.contains("auditlog_receiver_log_batches_received_total"));
        assert!(text.contains("encoding=\"protobuf\""));
        assert!(text.contains("auditlog_receiver_log_records_received_total 3"));
        assert!(text.contains("auditlog_receiver_entries_persisted_total 1"));
        assert!(text.contains("path=\"ingest\""));
        assert!(text.contains("auditlog_receiver_circuit_breaker_state 2"));
        assert!(text.contains("auditlog_receiver_pending_entries 4"));
    }

    #[test]
    fn encode_is_idempotent() {
        let metrics = ReceiverMetrics::new();
        let first = metrics.encode();
        let second = metrics.encode();
        assert_eq!(first, second);
    }
}
