//! File-backed key store: `<dir>/<blake3(user id)>.key`, 32 raw bytes, mode 0600.
//!
//! Writes land in a sibling temp file first and are renamed into place, so a
//! crash mid-write leaves either the old key or the new one, never a torn file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hush_core::{HushError, HushResult};
use hush_crypto::MasterKey;
use zeroize::Zeroizing;

use crate::{storage_name, KeyStore};

pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the key file for `user_id` (whether or not it exists)
    pub fn key_path(&self, user_id: &str) -> PathBuf {
        self.dir.join(format!("{}.key", storage_name(user_id)))
    }
}

#[async_trait]
impl KeyStore for FileKeyStore {
    async fn load(&self, user_id: &str) -> HushResult<Option<Zeroizing<Vec<u8>>>> {
        let path = self.key_path(user_id);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(Zeroizing::new(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HushError::KeyStore(format!(
                "reading key file {}: {e}",
                path.display()
            ))),
        }
    }

    async fn save(&self, user_id: &str, key: &MasterKey) -> HushResult<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            HushError::KeyStore(format!("creating key dir {}: {e}", self.dir.display()))
        })?;
        restrict_permissions(&self.dir, 0o700).await?;

        let path = self.key_path(user_id);
        let tmp = path.with_extension("key.tmp");

        tokio::fs::write(&tmp, key.as_bytes())
            .await
            .map_err(|e| HushError::KeyStore(format!("writing {}: {e}", tmp.display())))?;
        restrict_permissions(&tmp, 0o600).await?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            HushError::KeyStore(format!("renaming into {}: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), "stored master key file");
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> HushResult<()> {
        let path = self.key_path(user_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted master key file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HushError::KeyStore(format!(
                "deleting key file {}: {e}",
                path.display()
            ))),
        }
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path, mode: u32) -> HushResult<()> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .await
        .map_err(|e| HushError::KeyStore(format!("chmod {mode:o} {}: {e}", path.display())))
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path, _mode: u32) -> HushResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys"));
        let key = MasterKey::from_bytes([9u8; 32]);

        assert!(store.load("u1").await.unwrap().is_none());
        store.save("u1", &key).await.unwrap();

        let loaded = store.load("u1").await.unwrap().unwrap();
        assert_eq!(loaded.as_slice(), key.as_bytes());
        assert!(!store.key_path("u1").with_extension("key.tmp").exists());
    }

    #[tokio::test]
    async fn test_users_are_partitioned() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());

        store.save("alice", &MasterKey::from_bytes([1u8; 32])).await.unwrap();
        store.save("bob", &MasterKey::from_bytes([2u8; 32])).await.unwrap();

        assert_ne!(store.key_path("alice"), store.key_path("bob"));
        assert_eq!(store.load("alice").await.unwrap().unwrap()[0], 1);
        assert_eq!(store.load("bob").await.unwrap().unwrap()[0], 2);
        assert!(store.load("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());

        store.save("u1", &MasterKey::from_bytes([1u8; 32])).await.unwrap();
        store.save("u1", &MasterKey::from_bytes([2u8; 32])).await.unwrap();
        assert_eq!(store.load("u1").await.unwrap().unwrap().as_slice(), &[2u8; 32]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path());

        store.save("u1", &MasterKey::from_bytes([1u8; 32])).await.unwrap();
        store.delete("u1").await.unwrap();
        store.delete("u1").await.unwrap();
        assert!(store.load("u1").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyStore::new(dir.path().join("keys"));
        store.save("u1", &MasterKey::generate()).await.unwrap();

        let mode = std::fs::metadata(store.key_path("u1")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
