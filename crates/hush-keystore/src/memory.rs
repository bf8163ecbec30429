//! In-process key store. Nothing survives the process.

use std::collections::HashMap;

use async_trait::async_trait;
use hush_core::HushResult;
use hush_crypto::MasterKey;
use tokio::sync::Mutex;
use zeroize::Zeroizing;

use crate::KeyStore;

#[derive(Default)]
pub struct MemoryKeyStore {
    entries: Mutex<HashMap<String, Zeroizing<Vec<u8>>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store arbitrary bytes for a user, bypassing length validation.
    pub async fn insert_raw(&self, user_id: &str, bytes: &[u8]) {
        self.entries
            .lock()
            .await
            .insert(user_id.to_string(), Zeroizing::new(bytes.to_vec()));
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn load(&self, user_id: &str) -> HushResult<Option<Zeroizing<Vec<u8>>>> {
        Ok(self.entries.lock().await.get(user_id).cloned())
    }

    async fn save(&self, user_id: &str, key: &MasterKey) -> HushResult<()> {
        self.insert_raw(user_id, key.as_bytes()).await;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> HushResult<()> {
        self.entries.lock().await.remove(user_id);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = MemoryKeyStore::new();
        let key = MasterKey::from_bytes([5u8; 32]);

        assert!(store.load("u1").await.unwrap().is_none());
        store.save("u1", &key).await.unwrap();
        assert_eq!(store.load("u1").await.unwrap().unwrap().as_slice(), key.as_bytes());
        assert!(store.load("u2").await.unwrap().is_none());

        store.delete("u1").await.unwrap();
        assert!(store.is_empty().await);
        store.delete("u1").await.unwrap();
    }
}
