//! Master key material and the derivation-ready handle built from it.

use std::sync::Arc;

use hush_core::{HushError, HushResult, SchemeGeneration};
use rand::RngCore;
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A user's 256-bit master key. Zeroized on drop.
#[derive(Clone)]
pub struct MasterKey {
    bytes: [u8; KEY_SIZE],
}

impl MasterKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Copy from an untrusted slice, rejecting anything that isn't exactly 32 bytes.
    pub fn try_from_slice(bytes: &[u8]) -> HushResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(HushError::InvalidKeyLength(bytes.len()));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(Self::from_bytes(key))
    }

    /// Generate a random master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// First 16 hex chars of BLAKE3(key). Safe to display and compare.
    pub fn fingerprint(&self) -> String {
        blake3::hash(&self.bytes).to_hex().as_str()[..16].to_string()
    }
}

impl Drop for MasterKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A master key imported for derivation, shared between callers.
///
/// Cloning is cheap. The raw bytes are only reachable from inside this crate,
/// by the KDF.
#[derive(Clone)]
pub struct MasterKeyHandle {
    key: Arc<MasterKey>,
    fingerprint: Arc<str>,
    scheme: SchemeGeneration,
}

impl MasterKeyHandle {
    pub fn new(key: MasterKey, scheme: SchemeGeneration) -> Self {
        let fingerprint = Arc::from(key.fingerprint());
        Self {
            key: Arc::new(key),
            fingerprint,
            scheme,
        }
    }

    /// Handle for the current (random, persisted) scheme.
    pub fn current(key: MasterKey) -> Self {
        Self::new(key, SchemeGeneration::RandomPersisted)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn scheme(&self) -> SchemeGeneration {
        self.scheme
    }

    pub(crate) fn secret(&self) -> &[u8; KEY_SIZE] {
        self.key.as_bytes()
    }
}

impl std::fmt::Debug for MasterKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKeyHandle")
            .field("fingerprint", &self.fingerprint)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Short, stable tag for a user id, used in log fields and storage names so
/// the raw identity never appears there.
pub fn user_tag(user_id: &str) -> String {
    blake3::hash(user_id.as_bytes()).to_hex().as_str()[..12].to_string()
}
