use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{KeyValueStore, StoreError};

/// Process-local store. Records are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        assert!(store.get("gh-access-token:u1").await.unwrap().is_none());

        store.set("gh-access-token:u1", b"first".to_vec()).await.unwrap();
        store.set("gh-access-token:u1", b"second".to_vec()).await.unwrap();
        assert_eq!(
            store.get("gh-access-token:u1").await.unwrap().as_deref(),
            Some(&b"second"[..])
        );

        store.delete("gh-access-token:u1").await.unwrap();
        store.delete("gh-access-token:u1").await.unwrap();
        assert!(store.get("gh-access-token:u1").await.unwrap().is_none());
    }
}
