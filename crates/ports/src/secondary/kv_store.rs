use std::future::Future;
use std::pin::Pin;

use domain::auditlog::error::StorageError;

/// One operation inside a storage batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
    Get { key: String },
}

impl BatchOp {
    pub fn set(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self::Set {
            key: key.into(),
            value,
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    pub fn get(key: impl Into<String>) -> Self {
        Self::Get { key: key.into() }
    }
}

/// Secondary port for the pluggable key-value storage collaborator.
///
/// The contract is deliberately narrow so that file, Redis, or SQL
/// backends can sit behind it. `get` returns `None` for an absent key
/// rather than an error, and `delete` is idempotent.
///
/// `batch` must apply its operations atomically with respect to
/// concurrent batches or single-key operations against the same backend;
/// a backend that cannot offer atomicity must at minimum apply them in
/// order. The returned vector has one slot per operation, populated for
/// `Get` operations and `None` for writes.
///
/// Uses `Pin<Box<dyn Future>>` return types (instead of RPITIT) so the
/// trait is dyn-compatible and can be used as `Arc<dyn KvStore>`.
pub trait KvStore: Send + Sync + std::fmt::Debug {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send + 'a>>;

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;

    fn batch<'a>(
        &'a self,
        ops: Vec<BatchOp>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Option<Vec<u8>>>, StorageError>> + Send + 'a>>;

    fn close<'a>(&'a self)
        -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>>;
}
