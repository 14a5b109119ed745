use serde::{Deserialize, Serialize};

/// Where delivered batches go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerMode {
    /// Emit each batch to the receiver's own structured log. The default,
    /// useful for development and smoke tests.
    Log,
    /// Forward the protobuf batch to an upstream OTLP/HTTP endpoint.
    OtlpHttp,
}

fn default_mode() -> ConsumerMode {
    ConsumerMode::Log
}

fn default_max_attempts() -> usize {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_attempt_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerConfig {
    #[serde(default = "default_mode")]
    pub mode: ConsumerMode,

    /// Upstream OTLP/HTTP logs endpoint. Required for `otlp_http`.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Optional `Authorization` header value sent upstream. Masked in
    /// sanitized config output.
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Transport-level retry budget per delivery attempt. Sustained
    /// failure is handled by the circuit breaker, not by retries.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            endpoint: None,
            auth_header: None,
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}
