//! Master key lifecycle on top of a [`KeyStore`]: provision, export, import.

use hush_core::{HushError, HushResult};
use hush_crypto::{user_tag, MasterKey, KEY_SIZE};
use secrecy::SecretString;

use crate::KeyStore;

/// What provisioning had to do to produce the key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// An existing, valid key was read
    Loaded,
    /// No key existed; a new one was generated and persisted
    Created,
    /// The stored key had the wrong length and was replaced. Everything
    /// sealed under the discarded key is now unrecoverable.
    Regenerated { discarded_len: usize },
}

#[derive(Debug)]
pub struct Provisioned {
    pub key: MasterKey,
    pub outcome: ProvisionOutcome,
}

/// Return the user's master key, creating and persisting one on first use.
///
/// A stored key whose length is not 32 bytes is deleted and regenerated. That
/// loses access to every envelope sealed under it, so the event is logged at
/// error level and reported as [`ProvisionOutcome::Regenerated`].
pub async fn get_or_create_master_key(
    store: &dyn KeyStore,
    user_id: &str,
) -> HushResult<Provisioned> {
    let user = user_tag(user_id);

    let outcome = match store.load(user_id).await? {
        Some(bytes) if bytes.len() == KEY_SIZE => {
            let key = MasterKey::try_from_slice(&bytes)?;
            tracing::trace!(user = %user, backend = store.backend(), "master key loaded");
            return Ok(Provisioned {
                key,
                outcome: ProvisionOutcome::Loaded,
            });
        }
        Some(bytes) => {
            tracing::error!(
                user = %user,
                backend = store.backend(),
                stored_len = bytes.len(),
                "stored master key is corrupted; regenerating. Data sealed under the old key is unrecoverable"
            );
            store.delete(user_id).await?;
            ProvisionOutcome::Regenerated {
                discarded_len: bytes.len(),
            }
        }
        None => ProvisionOutcome::Created,
    };

    let key = MasterKey::generate();
    store.save(user_id, &key).await?;
    tracing::info!(
        user = %user,
        backend = store.backend(),
        fingerprint = %key.fingerprint(),
        "provisioned new master key"
    );
    Ok(Provisioned { key, outcome })
}

/// Read the stored key without creating one.
///
/// `Ok(None)` if the user has no key; a corrupted key is an error here, since
/// only provisioning is allowed to replace it.
pub async fn peek_master_key(store: &dyn KeyStore, user_id: &str) -> HushResult<Option<MasterKey>> {
    match store.load(user_id).await? {
        Some(bytes) => MasterKey::try_from_slice(&bytes).map(Some),
        None => Ok(None),
    }
}

/// Export the user's master key as a base64 string.
///
/// Whoever holds the string can decrypt everything this user has sealed.
pub async fn export_master_key(store: &dyn KeyStore, user_id: &str) -> HushResult<SecretString> {
    let key = peek_master_key(store, user_id)
        .await?
        .ok_or_else(|| HushError::NoKeyFound(user_tag(user_id)))?;
    tracing::info!(
        user = %user_tag(user_id),
        fingerprint = %key.fingerprint(),
        "master key exported"
    );
    Ok(SecretString::from(hush_crypto::encode(key.as_bytes())))
}

/// Parse and validate an exported key string.
///
/// Surrounding whitespace is ignored. Nothing is written, so a bad backup can
/// be rejected before the existing key is touched.
pub fn parse_exported_key(exported: &str) -> HushResult<MasterKey> {
    let bytes = zeroize::Zeroizing::new(hush_crypto::decode(exported.trim())?);
    MasterKey::try_from_slice(&bytes)
}

/// Overwrite the user's stored key with `key`.
///
/// Returns the fingerprint of the key that was replaced, if a valid one was
/// stored. Callers must hold the user's write guard (see
/// [`KeyCache::replace`](crate::KeyCache::replace)).
pub async fn replace_master_key(
    store: &dyn KeyStore,
    user_id: &str,
    key: &MasterKey,
) -> HushResult<Option<String>> {
    let previous = match peek_master_key(store, user_id).await {
        Ok(existing) => existing.map(|k| k.fingerprint()),
        Err(HushError::InvalidKeyLength(_)) => None,
        Err(e) => return Err(e),
    };

    store.save(user_id, key).await?;
    tracing::warn!(
        user = %user_tag(user_id),
        backend = store.backend(),
        fingerprint = %key.fingerprint(),
        "master key replaced by import"
    );
    Ok(previous)
}
