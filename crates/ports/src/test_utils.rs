//! Shared test doubles for the secondary ports.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use domain::auditlog::error::{ConsumerError, StorageError};
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;

use crate::secondary::kv_store::{BatchOp, KvStore};
use crate::secondary::log_consumer::LogConsumer;
use crate::secondary::metrics_port::MetricsPort;

/// In-memory `KvStore` backed by a `BTreeMap` behind one mutex, which
/// makes every batch trivially atomic.
#[derive(Default, Debug)]
pub struct MemoryKv {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key directly, bypassing the trait (for arranging test state).
    pub fn seed(&self, key: &str, value: Vec<u8>) {
        self.entries.lock().unwrap().insert(key.to_string(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    pub fn raw_get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).cloned()
    }
}

impl KvStore for MemoryKv {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send + 'a>> {
        Box::pin(async move { Ok(self.entries.lock().unwrap().get(key).cloned()) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.entries.lock().unwrap().insert(key.to_string(), value);
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        })
    }

    fn batch<'a>(
        &'a self,
        ops: Vec<BatchOp>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Option<Vec<u8>>>, StorageError>> + Send + 'a>>
    {
        Box::pin(async move {
            let mut entries = self.entries.lock().unwrap();
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
        Box::pin(async { Ok(()) })
    }
}

/// `KvStore` double whose every operation fails, for storage-error paths.
#[derive(Debug)]
pub struct FailingKv;

impl KvStore for FailingKv {
    fn get<'a>(
        &'a self,
        _key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send + 'a>> {
        Box::pin(async { Err(StorageError::Backend("injected get failure".to_string())) })
    }

    fn set<'a>(
        &'a self,
        _key: &'a str,
        _value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async { Err(StorageError::Backend("injected set failure".to_string())) })
    }

    fn delete<'a>(
        &'a self,
        _key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async { Err(StorageError::Backend("injected delete failure".to_string())) })
    }

    fn batch<'a>(
        &'a self,
        _ops: Vec<BatchOp>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Option<Vec<u8>>>, StorageError>> + Send + 'a>>
    {
        Box::pin(async { Err(StorageError::Backend("injected batch failure".to_string())) })
    }

    fn close<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

/// `LogConsumer` double that records every accepted batch and can be told
/// to fail the next N calls.
#[derive(Default)]
pub struct RecordingConsumer {
    accepted: Mutex<Vec<ExportLogsServiceRequest>>,
    fail_remaining: AtomicU32,
    calls: AtomicUsize,
}

impl RecordingConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` `consume_logs` calls fail before succeeding again.
    pub fn fail_next(&self, n: u32) {
        self.fail_remaining.store(n, Ordering::SeqCst);
    }

    /// Batches the consumer acknowledged, in arrival order.
    pub fn accepted(&self) -> Vec<ExportLogsServiceRequest> {
        self.accepted.lock().unwrap().clone()
    }

    /// Total calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LogConsumer for RecordingConsumer {
    fn consume_logs<'a>(
        &'a self,
        request: &'a ExportLogsServiceRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let remaining = self.fail_remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_remaining.store(remaining - 1, Ordering::SeqCst);
                return Err(ConsumerError("injected consumer failure".to_string()));
            }
            self.accepted.lock().unwrap().push(request.clone());
            Ok(())
        })
    }
}

/// No-op `MetricsPort` for tests that do not assert on metrics.
pub struct NoopMetrics;

impl MetricsPort for NoopMetrics {}
