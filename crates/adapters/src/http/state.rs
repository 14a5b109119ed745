use std::sync::Arc;
use std::time::Instant;

use application::ingest_service_impl::IngestAppService;
use infrastructure::metrics::ReceiverMetrics;

/// Shared application state for the HTTP server.
///
/// Passed to Axum handlers via `State(Arc<AppState>)`.
pub struct AppState {
    pub ingest: Arc<IngestAppService>,
    pub metrics: Arc<ReceiverMetrics>,
    pub start_time: Instant,
    pub version: &'static str,
}

impl AppState {
    pub fn new(ingest: Arc<IngestAppService>, metrics: Arc<ReceiverMetrics>) -> Self {
        Self {
            ingest,
            metrics,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
