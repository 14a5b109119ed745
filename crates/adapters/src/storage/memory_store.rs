use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use domain::auditlog::error::StorageError;
use ports::secondary::kv_store::{BatchOp, KvStore};

/// Process-memory `KvStore` for development and smoke tests.
///
/// Entries do not survive a restart, which forfeits the durability
/// guarantee — the config layer selects it explicitly, never by default.
/// One mutex guards the map, so batches are atomic by construction.
#[derive(Default, Debug)]
pub struct MemoryKvStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(StorageError::Closed);
        }
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("storage mutex poisoned".to_string()))
    }
}

impl KvStore for MemoryKvStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.guard()?.get(key).cloned()) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.guard()?.insert(key.to_string(), value);
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.guard()?.remove(key);
            Ok(())
        })
    }

    fn batch<'a>(
        &'a self,
        ops: Vec<BatchOp>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Option<Vec<u8>>>, StorageError>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut entries = self.guard()?;
            let mut results = Vec::with_capacity(ops.len());
            for op in ops {
                match op {
                    BatchOp::Set { key, value } => {
                        entries.insert(key, value);
                        results.push(None);
                    }
                    BatchOp::Delete { key } => {
                        entries.remove(&key);
                        results.push(None);
                    }
                    BatchOp::Get { key } => results.push(entries.get(&key).cloned()),
                }
            }
            Ok(results)
        })
    }

    fn close<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        })
    }
}
