/// Secondary port for receiver metrics.
///
/// Every method has a no-op default so test doubles only implement what
/// they assert on. The production implementation lives in the
/// infrastructure crate and records into a Prometheus registry.
pub trait MetricsPort: Send + Sync {
    /// A batch arrived on the ingest endpoint.
    fn record_received(&self, _encoding: &str, _records: u64) {}

    /// An entry was durably persisted.
    fn record_persisted(&self) {}

    /// Outcome of one delivery attempt. `path` is `ingest` or `reprocess`,
    /// `outcome` is `success`, `failure`, or `deferred`.
    fn record_delivery(&self, _path: &str, _outcome: &str) {}

    /// A ghost key (index entry without a blob) was cleaned up.
    fn record_ghost_removed(&self) {}

    /// Circuit breaker state gauge (0=closed, 1=half-open, 2=open).
    fn record_circuit_state(&self, _state: u8) {}

    /// Number of entries currently awaiting redelivery.
    fn set_pending_entries(&self, _count: i64) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Defaults;
    impl MetricsPort for Defaults {}

    #[test]
    fn defaults_are_no_ops() {
        let m = Defaults;
        m.record_received("protobuf", 3);
        m.record_persisted();
        m.record_delivery("ingest", "success");
        m.record_ghost_removed();
        m.record_circuit_state(2);
        m.set_pending_entries(7);
    }
}
