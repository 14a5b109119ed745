use std::time::Duration;

// ── Defaults ───────────────────────────────────────────────────────

pub const DEFAULT_CONFIG_PATH: &str = "/etc/auditlogd/config.yaml";

/// Default HTTP listen address (the standard OTLP/HTTP port).
pub const DEFAULT_ENDPOINT: &str = "0.0.0.0:4318";

/// Reprocessor cadence.
pub const DEFAULT_PROCESS_INTERVAL_SECS: u64 = 30;

/// Minimum entry age before the reprocessor will redeliver it. Must
/// exceed expected consumer latency or the loop can race the inline
/// attempt.
pub const DEFAULT_PROCESS_AGE_THRESHOLD_SECS: u64 = 30;

/// Consecutive consumer failures before the circuit opens.
pub const DEFAULT_CIRCUIT_OPEN_THRESHOLD: usize = 5;

/// Dwell time in the open state before a half-open probe.
pub const DEFAULT_CIRCUIT_OPEN_DURATION_SECS: u64 = 60;

// ── Limits ─────────────────────────────────────────────────────────

/// Maximum ingest request body size (20 MiB).
pub const MAX_BODY_SIZE: usize = 20 * 1024 * 1024;

// ── Timeouts ───────────────────────────────────────────────────────

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
