//! Platform keychain backend.
//!
//! Uses the `keyring` crate:
//! - macOS: Keychain Services
//! - Linux: GNOME Keyring / Secret Service (D-Bus)
//! - Windows: Credential Manager (DPAPI)
//!
//! Entries are `<service>` / `master-key:<blake3(user id)>`, value = base64 key.
//! keyring calls block, so each runs on the blocking pool.

use async_trait::async_trait;
use hush_core::{HushError, HushResult};
use hush_crypto::MasterKey;
use zeroize::{Zeroize, Zeroizing};

use crate::{storage_name, KeyStore};

pub struct KeychainKeyStore {
    service: String,
}

impl KeychainKeyStore {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry_name(user_id: &str) -> String {
        format!("master-key:{}", storage_name(user_id))
    }

    async fn with_entry<T, F>(&self, user_id: &str, op: F) -> HushResult<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry, &str) -> HushResult<T> + Send + 'static,
    {
        let service = self.service.clone();
        let name = Self::entry_name(user_id);
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &name)
                .map_err(|e| HushError::KeyStore(format!("keychain entry creation: {e}")))?;
            op(entry, &name)
        })
        .await
        .map_err(|e| HushError::KeyStore(format!("keychain task: {e}")))?
    }
}

#[async_trait]
impl KeyStore for KeychainKeyStore {
    async fn load(&self, user_id: &str) -> HushResult<Option<Zeroizing<Vec<u8>>>> {
        self.with_entry(user_id, |entry, name| match entry.get_password() {
            Ok(mut encoded) => {
                let decoded = hush_crypto::decode(encoded.trim());
                encoded.zeroize();
                match decoded {
                    Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
                    Err(e) => {
                        // Surface as a zero-length key so the caller's
                        // corruption handling takes over.
                        tracing::warn!(entry = name, "keychain value is not base64: {e}");
                        Ok(Some(Zeroizing::new(Vec::new())))
                    }
                }
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(HushError::KeyStore(format!("keychain get for '{name}': {e}"))),
        })
        .await
    }

    async fn save(&self, user_id: &str, key: &MasterKey) -> HushResult<()> {
        let encoded = Zeroizing::new(hush_crypto::encode(key.as_bytes()));
        self.with_entry(user_id, move |entry, name| {
            entry
                .set_password(&encoded)
                .map_err(|e| HushError::KeyStore(format!("keychain store for '{name}': {e}")))?;
            tracing::debug!(entry = name, "stored master key in platform keychain");
            Ok(())
        })
        .await
    }

    async fn delete(&self, user_id: &str) -> HushResult<()> {
        self.with_entry(user_id, |entry, name| match entry.delete_credential() {
            Ok(()) => {
                tracing::debug!(entry = name, "deleted master key from platform keychain");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()), // already deleted
            Err(e) => Err(HushError::KeyStore(format!("keychain delete for '{name}': {e}"))),
        })
        .await
    }

    fn backend(&self) -> &'static str {
        "keychain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_names_partition_users() {
        let a = KeychainKeyStore::entry_name("alice");
        let b = KeychainKeyStore::entry_name("bob");
        assert!(a.starts_with("master-key:"));
        assert_ne!(a, b);
        assert!(!a.contains("alice"));
    }
}
