use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::error::{Result, StoreError};
use super::key::storage_key;
use super::traits::KeyValueStore;

/// In-process store used by `--dev` and as a test double.
///
/// Keeps the same namespacing and validation as the SQL store and counts
/// every operation that reaches it.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    rows: RwLock<HashMap<String, String>>,
    operations: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of put/get/delete calls received so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Persisted row ids, sorted.
    pub async fn raw_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.rows.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn record(&self) {
        self.operations.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.record();
        let id = storage_key(key)?;
        if value.is_empty() {
            return Err(StoreError::InvalidValue(key.to_string()));
        }
        self.rows.write().await.insert(id, value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.record();
        let id = storage_key(key)?;
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.record();
        let id = storage_key(key)?;
        self.rows.write().await.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_operations_and_namespaces_keys() {
        let store = MemoryKeyValueStore::new();
        assert_eq!(store.operations(), 0);

        store.put("aa:bb:cc:dd:ee:ff", "v1").await.unwrap();
        store.put("aa:bb:cc:dd:ee:ff", "v2").await.unwrap();
        assert_eq!(
            store.get("aa:bb:cc:dd:ee:ff").await.unwrap().as_deref(),
            Some("v2")
        );
        assert_eq!(store.raw_keys().await, vec!["/dhcpd/aa:bb:cc:dd:ee:ff"]);

        store.delete("aa:bb:cc:dd:ee:ff").await.unwrap();
        store.delete("aa:bb:cc:dd:ee:ff").await.unwrap();
        assert_eq!(store.get("aa:bb:cc:dd:ee:ff").await.unwrap(), None);
        assert_eq!(store.operations(), 6);
    }
}
