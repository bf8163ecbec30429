//! Manual key backup and restore.
//!
//! Export hands the raw master key to the user as text; import writes one
//! back, replacing whatever key the device had.

use hush_core::{HushError, HushResult};
use hush_crypto::{user_tag, MasterKey};
use hush_keystore::{export_master_key, parse_exported_key, peek_master_key};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::engine::Vault;

/// Shown alongside every exported key
pub const EXPORT_WARNING: &str = "Anyone holding this key can decrypt all of your messages \
and journal entries. Store it somewhere private and never share it.";

/// An exported master key and what to tell the user about it
pub struct ExportedKey {
    pub key: SecretString,
    pub fingerprint: String,
    pub warning: &'static str,
}

impl std::fmt::Debug for ExportedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedKey")
            .field("key", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Proof that the user agreed to overwrite their current key.
///
/// Only obtainable through [`OverwriteConfirmed::acknowledge`], so every import
/// call site has to spell the confirmation out.
#[derive(Debug, Clone, Copy)]
pub struct OverwriteConfirmed(());

impl OverwriteConfirmed {
    pub fn acknowledge() -> Self {
        Self(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    /// Fingerprint of the newly stored key
    pub fingerprint: String,
    /// Fingerprint of the key that was overwritten, if a valid one existed
    pub replaced: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyStatus {
    pub backend: &'static str,
    pub provisioned: bool,
    pub fingerprint: Option<String>,
    /// A key is stored but has the wrong length; the next provisioning will
    /// replace it
    pub corrupted: bool,
}

impl Vault {
    /// Export the user's master key. Fails with `NoKeyFound` if none exists;
    /// never provisions one.
    pub async fn export_encryption_key(&self, user_id: &str) -> HushResult<ExportedKey> {
        let key = export_master_key(self.store().as_ref(), user_id).await?;
        let raw = Zeroizing::new(hush_crypto::decode(key.expose_secret())?);
        let fingerprint = MasterKey::try_from_slice(&raw)?.fingerprint();
        Ok(ExportedKey {
            key,
            fingerprint,
            warning: EXPORT_WARNING,
        })
    }

    /// Replace the user's master key with an exported one. The cache serves the
    /// imported key from then on.
    ///
    /// Validation happens before any write: a malformed or wrong-length backup
    /// leaves the existing key in place. The write waits for any provisioning
    /// already running for this user, so a key generated concurrently never
    /// overwrites the import.
    pub async fn import_encryption_key(
        &self,
        user_id: &str,
        exported: &str,
        _confirmed: OverwriteConfirmed,
    ) -> HushResult<ImportReport> {
        let key = parse_exported_key(exported)?;
        let fingerprint = key.fingerprint();
        let replaced = self.cache.replace(user_id, key).await?;

        if replaced.as_deref().is_some_and(|old| old != fingerprint) {
            tracing::warn!(
                user = %user_tag(user_id),
                "import replaced a different key; data sealed under the old key needs that key's backup"
            );
        }

        Ok(ImportReport {
            fingerprint,
            replaced,
        })
    }

    /// Report whether a key exists, without creating one.
    pub async fn key_status(&self, user_id: &str) -> HushResult<KeyStatus> {
        let store = self.store();
        let (fingerprint, corrupted) = match peek_master_key(store.as_ref(), user_id).await {
            Ok(key) => (key.map(|k| k.fingerprint()), false),
            Err(HushError::InvalidKeyLength(_)) => (None, true),
            Err(e) => return Err(e),
        };
        Ok(KeyStatus {
            backend: store.backend(),
            provisioned: fingerprint.is_some(),
            fingerprint,
            corrupted,
        })
    }
}
