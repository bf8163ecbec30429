//! hush-keystore: durable master keys, one per user per device
//!
//! Backends (selected by `[keystore] backend`):
//!   file     - one 0600 file per user, named by BLAKE3(user id)
//!   keychain - platform keychain entry per user
//!   memory   - process memory, for tests and throwaway sessions
//!
//! [`KeyCache`] sits in front of a backend and guarantees at most one
//! provisioning round-trip per user is in flight, and that provisioning and
//! import never write the same user's key concurrently.

pub mod cache;
pub mod file;
pub mod keychain;
pub mod master;
pub mod memory;

pub use cache::KeyCache;
pub use file::FileKeyStore;
pub use keychain::KeychainKeyStore;
pub use master::{
    export_master_key, get_or_create_master_key, parse_exported_key, peek_master_key,
    replace_master_key, ProvisionOutcome, Provisioned,
};
pub use memory::MemoryKeyStore;

use std::sync::Arc;

use async_trait::async_trait;
use hush_core::config::{KeyStoreBackend, KeyStoreConfig};
use hush_core::HushResult;
use hush_crypto::MasterKey;
use zeroize::Zeroizing;

/// Durable storage for raw master key bytes, partitioned by user id.
///
/// `load` returns whatever is stored, even if it is the wrong length;
/// validation is the caller's job so corruption can be detected.
#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn load(&self, user_id: &str) -> HushResult<Option<Zeroizing<Vec<u8>>>>;

    /// Store `key` for `user_id`, replacing any existing entry.
    async fn save(&self, user_id: &str, key: &MasterKey) -> HushResult<()>;

    /// Remove the entry for `user_id`. Missing entries are not an error.
    async fn delete(&self, user_id: &str) -> HushResult<()>;

    /// Backend name for logs and status output
    fn backend(&self) -> &'static str;
}

/// Build the backend named in the config.
pub fn open_store(config: &KeyStoreConfig) -> Arc<dyn KeyStore> {
    match config.backend {
        KeyStoreBackend::File => Arc::new(FileKeyStore::new(config.dir.clone())),
        KeyStoreBackend::Keychain => Arc::new(KeychainKeyStore::new(config.service.clone())),
        KeyStoreBackend::Memory => Arc::new(MemoryKeyStore::new()),
    }
}

/// Storage name for a user: full hex BLAKE3 of the id.
///
/// Distinct ids never share a name, and no id can address a path or entry
/// outside its own.
pub(crate) fn storage_name(user_id: &str) -> String {
    blake3::hash(user_id.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_name_is_path_safe() {
        let name = storage_name("../../etc/passwd");
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(storage_name("u1"), storage_name("u2"));
    }

    #[test]
    fn test_open_store_backend_selection() {
        let mut config = KeyStoreConfig::default();
        config.backend = KeyStoreBackend::Memory;
        assert_eq!(open_store(&config).backend(), "memory");
        config.backend = KeyStoreBackend::File;
        assert_eq!(open_store(&config).backend(), "file");
    }
}
