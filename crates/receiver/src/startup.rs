use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use adapters::consumer::log_consumer::LogSinkConsumer;
use adapters::consumer::otlp_http_consumer::OtlpHttpConsumer;
use adapters::http::{AppState, run_http_server};
use adapters::storage::memory_store::MemoryKvStore;
use adapters::storage::redb_store::RedbKvStore;
use application::ingest_service_impl::IngestAppService;
use application::key_index::KeyIndexStore;
use application::reprocessor::Reprocessor;
use application::retry::RetryPolicy;
use domain::breaker::CircuitBreaker;
use infrastructure::config::{
    ConfigError, ConsumerMode, LogFormat, LogLevel, ReceiverConfig, StorageBackend,
};
use infrastructure::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use infrastructure::logging::init_logging;
use infrastructure::metrics::ReceiverMetrics;
use ports::secondary::kv_store::KvStore;
use ports::secondary::log_consumer::LogConsumer;
use ports::secondary::metrics_port::MetricsPort;
use tracing::{info, warn};

use crate::cli::Cli;
use crate::shutdown::create_shutdown_token;

/// Run the receiver startup sequence and block until shutdown.
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    // ── 1. Load config ──────────────────────────────────────────────
    let config = ReceiverConfig::load(Path::new(&cli.config))?;

    // ── 2. Initialize logging (CLI flags beat the config file) ──────
    let log_level = match &cli.log_level {
        Some(value) => LogLevel::parse_name(value)?,
        None => config.receiver.log_level,
    };
    let log_format = match &cli.log_format {
        Some(value) => LogFormat::parse_name(value)?,
        None => config.receiver.log_format,
    };
    init_logging(log_level, log_format)?;

    // Service root span — fields appear in every subsequent log entry.
    let _root_span = tracing::span!(
        tracing::Level::INFO,
        "service",
        service.name = "auditlogd",
        service.version = env!("CARGO_PKG_VERSION"),
    )
    .entered();

    info!(
        config_path = %cli.config,
        endpoint = %config.receiver.endpoint,
        storage = config.storage.backend.as_str(),
        "audit log receiver starting"
    );

    // ── 3. Resolve the storage backend ──────────────────────────────
    let store = resolve_storage(&config)?;

    // ── 4. Build the core services ──────────────────────────────────
    let metrics = Arc::new(ReceiverMetrics::new());
    let breaker = Arc::new(CircuitBreaker::new(
        config.circuit_breaker.enabled,
        config.circuit_breaker.circuit_open_threshold,
        config.circuit_open_duration(),
    ));
    let consumer = build_consumer(&config);
    let key_index = Arc::new(KeyIndexStore::new(Arc::clone(&store)));
    let ingest = Arc::new(IngestAppService::new(
        key_index,
        consumer,
        breaker,
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
    ));

    // ── 5. Launch the reprocessor ───────────────────────────────────
    let token = create_shutdown_token();
    let reprocessor = Reprocessor::new(
        Arc::clone(&ingest),
        Arc::clone(&metrics) as Arc<dyn MetricsPort>,
        config.process_interval(),
        config.process_age_threshold(),
    );
    let reprocessor_handle = tokio::spawn(reprocessor.run(token.clone()));
    info!(
        interval_secs = config.process_interval_secs,
        age_threshold_secs = config.process_age_threshold_secs,
        "reprocessor started"
    );

    // ── 6. Serve HTTP until shutdown, then drain ────────────────────
    let state = Arc::new(AppState::new(ingest, metrics));
    let server_result =
        run_http_server(state, &config.receiver.endpoint, token.clone().cancelled_owned()).await;

    // Reached on shutdown signal or on a fatal server error; either way
    // wind down the reprocessor and the storage client.
    token.cancel();
    if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, reprocessor_handle)
        .await
        .is_err()
    {
        warn!("reprocessor did not stop within the graceful timeout");
    }
    if let Err(e) = store.close().await {
        warn!(error = %e, "failed to close storage client");
    }

    info!("audit log receiver stopped");
    server_result
}

/// Resolve the configured storage backend into a live client. A missing
/// or unusable backend is fatal at start.
fn resolve_storage(config: &ReceiverConfig) -> Result<Arc<dyn KvStore>, ConfigError> {
    match config.storage.backend {
        StorageBackend::File => {
            let path = config.storage.path.as_deref().ok_or_else(|| {
                ConfigError::Validation {
                    field: "storage.path".to_string(),
                    message: "file backend requires a database path".to_string(),
                }
            })?;
            let store = RedbKvStore::open(Path::new(path))
                .map_err(|e| ConfigError::Storage(e.to_string()))?;
            info!(path, "file storage opened");
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("memory storage selected: entries will not survive a restart");
            Ok(Arc::new(MemoryKvStore::new()))
        }
    }
}

fn build_consumer(config: &ReceiverConfig) -> Arc<dyn LogConsumer> {
    match config.consumer.mode {
        ConsumerMode::Log => Arc::new(LogSinkConsumer),
        ConsumerMode::OtlpHttp => {
            // Validated at config load: otlp_http requires an endpoint.
            let endpoint = config.consumer.endpoint.clone().unwrap_or_default();
            let retry = RetryPolicy {
                max_attempts: config.consumer.max_attempts,
                initial_backoff: Duration::from_millis(config.consumer.initial_backoff_ms),
                attempt_timeout: Duration::from_secs(config.consumer.attempt_timeout_secs),
                ..RetryPolicy::default()
            };
            info!(%endpoint, "forwarding batches to upstream OTLP endpoint");
            Arc::new(OtlpHttpConsumer::new(
                endpoint,
                config.consumer.auth_header.clone(),
                retry,
            ))
        }
    }
}
