use serde::{Deserialize, Serialize};

/// Which key-value backend persists audit log entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// redb file database. Batches are single write transactions, so the
    /// key-index invariants hold even across a crash.
    File,
    /// Process-memory map. Entries do not survive a restart; intended for
    /// development and tests.
    Memory,
}

impl StorageBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Database file path. Required for the `file` backend.
    #[serde(default)]
    pub path: Option<String>,
}
