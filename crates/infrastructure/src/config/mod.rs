//! Receiver configuration: structs, parsing, and validation.
//!
//! Split across sub-modules:
//! - `common`: `ConfigError`, log settings, shared serde defaults
//! - `storage`: key-value backend selection
//! - `consumer`: downstream consumer selection and retry knobs

mod common;
mod consumer;
mod storage;

pub use common::{ConfigError, LogFormat, LogLevel};
pub use consumer::{ConsumerConfig, ConsumerMode};
pub use storage::{StorageBackend, StorageConfig};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_CIRCUIT_OPEN_DURATION_SECS, DEFAULT_CIRCUIT_OPEN_THRESHOLD,
    DEFAULT_PROCESS_AGE_THRESHOLD_SECS, DEFAULT_PROCESS_INTERVAL_SECS,
};
use common::{default_log_format, default_log_level, default_true};

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverConfig {
    pub receiver: ReceiverSection,

    pub storage: StorageConfig,

    #[serde(default = "default_process_interval")]
    pub process_interval_secs: u64,

    #[serde(default = "default_process_age_threshold")]
    pub process_age_threshold_secs: u64,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub consumer: ConsumerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverSection {
    /// HTTP listen address, e.g. `0.0.0.0:4318`.
    pub endpoint: String,

    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_circuit_open_threshold")]
    pub circuit_open_threshold: usize,

    #[serde(default = "default_circuit_open_duration")]
    pub circuit_open_duration_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            circuit_open_threshold: default_circuit_open_threshold(),
            circuit_open_duration_secs: default_circuit_open_duration(),
        }
    }
}

fn default_process_interval() -> u64 {
    DEFAULT_PROCESS_INTERVAL_SECS
}

fn default_process_age_threshold() -> u64 {
    DEFAULT_PROCESS_AGE_THRESHOLD_SECS
}

fn default_circuit_open_threshold() -> usize {
    DEFAULT_CIRCUIT_OPEN_THRESHOLD
}

fn default_circuit_open_duration() -> u64 {
    DEFAULT_CIRCUIT_OPEN_DURATION_SECS
}

impl ReceiverConfig {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Return a copy of the config with sensitive values masked.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut sanitized = self.clone();
        if sanitized.consumer.auth_header.is_some() {
            sanitized.consumer.auth_header = Some("***".to_string());
        }
        sanitized
    }

    /// Validate the config after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.receiver.endpoint.is_empty() {
            return Err(ConfigError::Validation {
                field: "receiver.endpoint".to_string(),
                message: "listen address is required".to_string(),
            });
        }
        if self.receiver.endpoint.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Validation {
                field: "receiver.endpoint".to_string(),
                message: format!("'{}' is not a host:port address", self.receiver.endpoint),
            });
        }

        if self.storage.backend == StorageBackend::File
            && self.storage.path.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::Validation {
                field: "storage.path".to_string(),
                message: "file backend requires a database path".to_string(),
            });
        }

        if self.process_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "process_interval_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.circuit_breaker.enabled && self.circuit_breaker.circuit_open_threshold == 0 {
            return Err(ConfigError::Validation {
                field: "circuit_breaker.circuit_open_threshold".to_string(),
                message: "must be greater than zero when the breaker is enabled".to_string(),
            });
        }

        if self.consumer.mode == ConsumerMode::OtlpHttp
            && self.consumer.endpoint.as_deref().unwrap_or("").is_empty()
        {
            return Err(ConfigError::Validation {
                field: "consumer.endpoint".to_string(),
                message: "otlp_http consumer requires an endpoint".to_string(),
            });
        }

        Ok(())
    }

    pub fn process_interval(&self) -> Duration {
        Duration::from_secs(self.process_interval_secs)
    }

    pub fn process_age_threshold(&self) -> Duration {
        Duration::from_secs(self.process_age_threshold_secs)
    }

    pub fn circuit_open_duration(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker.circuit_open_duration_secs)
    }
}
