//! In-process store backed by a HashMap.

use crate::kvcache::error::Result;
use crate::kvcache::store::KeyValueStore;
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};

/// HashMap-backed store.
///
/// Cloning shares the underlying map, so a population task and the index can
/// hold the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.write().insert(key.into(), value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.write().remove(key)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let entries = self.entries.read();
        Ok(keys.iter().map(|key| entries.get(key).cloned()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_many_preserves_order() {
        let store = MemoryStore::new();
        store.set("a", "10.0.0.1:8000");
        store.set("c", "10.0.0.3:8000");

        let keys = vec!["c".to_string(), "b".to_string(), "a".to_string()];
        let values = store.get_many(&keys).await.unwrap();
        assert_eq!(
            values,
            vec![
                Some(b"10.0.0.3:8000".to_vec()),
                None,
                Some(b"10.0.0.1:8000".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn test_set_remove_clear() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.set("k", "h:1");
        store.set("k", "h:2");
        assert_eq!(store.len(), 1);

        let shared = store.clone();
        assert_eq!(shared.remove("k"), Some(b"h:2".to_vec()));
        assert!(store.is_empty());

        store.set("x", "h:1");
        store.set("y", "h:1");
        store.clear();
        assert_eq!(store.len(), 0);
    }
}
