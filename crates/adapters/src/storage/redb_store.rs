use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use domain::auditlog::error::StorageError;
use ports::secondary::kv_store::{BatchOp, KvStore};
use redb::{Database, ReadableTable, TableDefinition};

/// redb table: entry key (UUID string or the reserved keys-list key) to
/// opaque blob.
const ENTRIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("audit_entries");

fn backend_err(context: &str, e: impl std::fmt::Display) -> StorageError {
    StorageError::Backend(format!("{context}: {e}"))
}

/// File-backed `KvStore` using redb.
///
/// Every `batch` call runs inside a single write transaction, so the
/// entry blob and the keys-list update commit or roll back together —
/// exactly the atomicity the key-index invariants need across a crash.
#[derive(Debug)]
pub struct RedbKvStore {
    db: Database,
}

impl RedbKvStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = Database::create(path).map_err(|e| backend_err("redb open failed", e))?;

        // Ensure the table exists so later reads never race its creation.
        let txn = db
            .begin_write()
            .map_err(|e| backend_err("redb txn begin", e))?;
        {
            let _table = txn
                .open_table(ENTRIES_TABLE)
                .map_err(|e| backend_err("redb table create", e))?;
        }
        txn.commit().map_err(|e| backend_err("redb commit", e))?;

        Ok(Self { db })
    }

    fn get_sync(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let txn = self
            .db
            .begin_read()
            .map_err(|e| backend_err("redb read txn", e))?;
        let table = txn
            .open_table(ENTRIES_TABLE)
            .map_err(|e| backend_err("redb read table", e))?;
        let value = table
            .get(key)
            .map_err(|e| backend_err("redb get", e))?
            .map(|guard| guard.value().to_vec());
        Ok(value)
    }

    fn apply_sync(&self, ops: Vec<BatchOp>) -> Result<Vec<Option<Vec<u8>>>, StorageError> {
        let txn = self
            .db
            .begin_write()
            .map_err(|e| backend_err("redb write txn", e))?;
        let mut results = Vec::with_capacity(ops.len());
        {
            let mut table = txn
                .open_table(ENTRIES_TABLE)
                .map_err(|e| backend_err("redb write table", e))?;
            for op in ops {
                match op {
                    BatchOp::Set { key, value } => {
                        table
                            .insert(key.as_str(), value.as_slice())
                            .map_err(|e| backend_err("redb insert", e))?;
                        results.push(None);
                    }
                    BatchOp::Delete { key } => {
                        table
                            .remove(key.as_str())
                            .map_err(|e| backend_err("redb remove", e))?;
                        results.push(None);
                    }
                    BatchOp::Get { key } => {
                        let value = table
                            .get(key.as_str())
                            .map_err(|e| backend_err("redb get", e))?
                            .map(|guard| guard.value().to_vec());
                        results.push(value);
                    }
                }
            }
        }
        txn.commit()
            .map_err(|e| backend_err("redb write commit", e))?;
        Ok(results)
    }
}

impl KvStore for RedbKvStore {
    fn get<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, StorageError>> + Send + 'a>> {
        Box::pin(async move { self.get_sync(key) })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.apply_sync(vec![BatchOp::Set {
                key: key.to_string(),
                value,
            }])?;
            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        key: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        Box::pin(async move {
            self.apply_sync(vec![BatchOp::delete(key)])?;
            Ok(())
        })
    }

    fn batch<'a>(
        &'a self,
        ops: Vec<BatchOp>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Option<Vec<u8>>>, StorageError>> + Send + 'a>>
    {
        Box::pin(async move { self.apply_sync(ops) })
    }

    fn close<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<(), StorageError>> + Send + 'a>> {
        // redb flushes on commit and closes on drop; nothing to do here.
        Box::pin(async {
            tracing::debug!("redb store closed");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn open_store() -> (NamedTempFile, RedbKvStore) {
        let file = NamedTempFile::new().unwrap();
        let store = RedbKvStore::open(file.path()).unwrap();
        (file, store)
    }

    #[tokio::test]
    async fn get_absent_returns_none() {
        let (_file, store) = open_store();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let (_file, store) = open_store();
        store.set("k", b"value".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn set_overwrites() {
        let (_file, store) = open_store();
        store.set("k", b"v1".to_vec()).await.unwrap();
        store.set("k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_file, store) = open_store();
        store.set("k", b"v".to_vec()).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn batch_applies_atomically_and_answers_gets() {
        let (_file, store) = open_store();
        store.set("old", b"gone".to_vec()).await.unwrap();

        let results = store
            .batch(vec![
                BatchOp::set("a", b"1".to_vec()),
                BatchOp::delete("old"),
                BatchOp::get("a"),
                BatchOp::get("old"),
            ])
            .await
            .unwrap();

        assert_eq!(results, vec![None, None, Some(b"1".to_vec()), None]);
        assert_eq!(store.get("a").await.unwrap(), Some(b"1".to_vec()));
        assert_eq!(store.get("old").await.unwrap(), None);
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let file = NamedTempFile::new().unwrap();
        {
            let store = RedbKvStore::open(file.path()).unwrap();
            store.set("persisted", b"still-here".to_vec()).await.unwrap();
            store.close().await.unwrap();
        }
        let store = RedbKvStore::open(file.path()).unwrap();
        assert_eq!(
            store.get("persisted").await.unwrap(),
            Some(b"still-here".to_vec())
        );
    }
}
