use std::sync::Arc;

use domain::auditlog::error::StorageError;
use ports::secondary::kv_store::{BatchOp, KvStore};
use tokio::sync::Mutex;

/// Reserved storage key holding the JSON array of live entry keys.
pub const KEYS_LIST_KEY: &str = "__keys_list__";

/// Maintains the set of live entry keys atomically alongside the entry
/// payloads.
///
/// The index is one JSON blob, so every read-modify-write cycle is
/// serialized by a single async mutex. Each mutation goes to the backend
/// as one batch, which keeps the invariant that an entry blob and its
/// index membership appear and disappear together. Readers outside the
/// lock may observe a stale index snapshot but never a torn one.
pub struct KeyIndexStore {
    store: Arc<dyn KvStore>,
    index_lock: Mutex<()>,
}

impl KeyIndexStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            index_lock: Mutex::new(()),
        }
    }

    /// All live entry keys in index order. An absent index reads as empty;
    /// ghost keys are not filtered here (the reprocessor cleans them up
    /// when it observes the missing blob).
    pub async fn list(&self) -> Result<Vec<String>, StorageError> {
        match self.store.get(KEYS_LIST_KEY).await? {
            None => Ok(Vec::new()),
            Some(data) => serde_json::from_slice(&data)
                .map_err(|e| StorageError::Codec(format!("keys list decode failed: {e}"))),
        }
    }

    /// Load one entry blob.
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.store.get(key).await
    }

    /// Persist an entry and register its key, in one batch.
    ///
    /// The index write is only included when the key is not already
    /// present, so re-persisting an existing key is an overwrite without
    /// an index change.
    pub async fn add_entry(&self, key: &str, payload: Vec<u8>) -> Result<(), StorageError> {
        let _guard = self.index_lock.lock().await;

        let mut keys = self.list().await?;
        let mut ops = vec![BatchOp::set(key, payload)];

        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
            let data = serde_json::to_vec(&keys)
                .map_err(|e| StorageError::Codec(format!("keys list encode failed: {e}")))?;
            ops.push(BatchOp::set(KEYS_LIST_KEY, data));
        }

        self.store.batch(ops).await?;
        Ok(())
    }

    /// Delete an entry and deregister its key, in one batch. Removing the
    /// last key deletes the index blob itself.
    pub async fn remove_entry(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.index_lock.lock().await;

        let keys = self.list().await?;
        let remaining: Vec<&String> = keys.iter().filter(|k| k.as_str() != key).collect();

        let mut ops = vec![BatchOp::delete(key)];
        if remaining.is_empty() {
            ops.push(BatchOp::delete(KEYS_LIST_KEY));
        } else {
            let data = serde_json::to_vec(&remaining)
                .map_err(|e| StorageError::Codec(format!("keys list encode failed: {e}")))?;
            ops.push(BatchOp::set(KEYS_LIST_KEY, data));
        }

        self.store.batch(ops).await?;
        Ok(())
    }

    /// Number of keys currently in the index.
    pub async fn pending_count(&self) -> Result<usize, StorageError> {
        Ok(self.list().await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ports::test_utils::MemoryKv;

    fn index_with_store() -> (Arc<MemoryKv>, KeyIndexStore) {
        let kv = Arc::new(MemoryKv::new());
        let index = KeyIndexStore::new(Arc::clone(&kv) as Arc<dyn KvStore>);
        (kv, index)
    }

    #[tokio::test]
    async fn absent_index_lists_empty() {
        let (_kv, index) = index_with_store();
        assert!(index.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_entry_writes_blob_and_index_together() {
        let (kv, index) = index_with_store();
        index.add_entry("a", b"payload-a".to_vec()).await.unwrap();

        assert_eq!(kv.raw_get("a").unwrap(), b"payload-a");
        assert_eq!(index.list().await.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn re_adding_existing_key_keeps_index_stable() {
        let (kv, index) = index_with_store();
        index.add_entry("a", b"v1".to_vec()).await.unwrap();
        index.add_entry("a", b"v2".to_vec()).await.unwrap();

        assert_eq!(kv.raw_get("a").unwrap(), b"v2");
        assert_eq!(index.list().await.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn index_preserves_insertion_order() {
        let (_kv, index) = index_with_store();
        for key in ["c", "a", "b"] {
            index.add_entry(key, key.as_bytes().to_vec()).await.unwrap();
        }
        assert_eq!(
            index.list().await.unwrap(),
            vec!["c".to_string(), "a".to_string(), "b".to_string()]
        );
    }

    #[tokio::test]
    async fn remove_entry_updates_index() {
        let (kv, index) = index_with_store();
        index.add_entry("a", vec![1]).await.unwrap();
        index.add_entry("b", vec![2]).await.unwrap();

        index.remove_entry("a").await.unwrap();
        assert!(!kv.contains("a"));
        assert_eq!(index.list().await.unwrap(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn removing_last_entry_deletes_index_blob() {
        let (kv, index) = index_with_store();
        index.add_entry("a", vec![1]).await.unwrap();
        index.remove_entry("a").await.unwrap();

        assert!(kv.is_empty());
        assert!(!kv.contains(KEYS_LIST_KEY));
    }

    #[tokio::test]
    async fn removing_unknown_key_is_idempotent() {
        let (kv, index) = index_with_store();
        index.add_entry("a", vec![1]).await.unwrap();
        index.remove_entry("nope").await.unwrap();

        assert!(kv.contains("a"));
        assert_eq!(index.list().await.unwrap(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn index_format_is_json_array() {
        let (kv, index) = index_with_store();
        index.add_entry("a", vec![1]).await.unwrap();
        index.add_entry("b", vec![2]).await.unwrap();

        let raw = kv.raw_get(KEYS_LIST_KEY).unwrap();
        let parsed: Vec<String> = serde_json::from_slice(&raw).unwrap();
        assert_eq!(parsed, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn corrupt_index_surfaces_codec_error() {
        let (kv, index) = index_with_store();
        kv.seed(KEYS_LIST_KEY, b"not json".to_vec());
        assert!(matches!(
            index.list().await.unwrap_err(),
            StorageError::Codec(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_adds_serialize_without_loss() {
        let kv = Arc::new(MemoryKv::new());
        let index = Arc::new(KeyIndexStore::new(Arc::clone(&kv) as Arc<dyn KvStore>));

        let mut handles = Vec::new();
        for i in 0..16 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move {
                index
                    .add_entry(&format!("key-{i}"), vec![i as u8])
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut keys = index.list().await.unwrap();
        keys.sort();
        assert_eq!(keys.len(), 16);
        for i in 0..16 {
            assert!(keys.contains(&format!("key-{i}")));
        }
    }
}
