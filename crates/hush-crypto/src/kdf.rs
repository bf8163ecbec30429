//! Per-message key derivation: PBKDF2-HMAC-SHA256(master key, salt).

use aes_gcm::{Aes256Gcm, KeyInit};
use hush_core::config::{DEFAULT_KDF_ITERATIONS, MIN_KDF_ITERATIONS};
use hush_core::{HushError, HushResult};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::keys::MasterKeyHandle;
use crate::{KEY_SIZE, SALT_SIZE};

/// PBKDF2 parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// HMAC-SHA256 rounds (default: 100000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn new(iterations: u32) -> HushResult<Self> {
        if iterations < MIN_KDF_ITERATIONS {
            return Err(HushError::Config(format!(
                "kdf iterations {iterations} below minimum {MIN_KDF_ITERATIONS}"
            )));
        }
        Ok(Self { iterations })
    }
}

/// A per-message AES-256-GCM key.
///
/// Holds an initialized cipher rather than key bytes; there is no accessor
/// for the raw key.
pub struct MessageKey {
    cipher: Aes256Gcm,
}

impl MessageKey {
    pub(crate) fn cipher(&self) -> &Aes256Gcm {
        &self.cipher
    }
}

impl std::fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageKey").finish_non_exhaustive()
    }
}

/// Derive the key for one message from the master key and that message's salt.
///
/// Deliberately slow. Async callers should run this on a blocking thread.
pub fn derive_message_key(
    master: &MasterKeyHandle,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> HushResult<MessageKey> {
    tracing::trace!(
        iterations = params.iterations,
        scheme = %master.scheme(),
        "deriving message key"
    );
    let mut okm = pbkdf2_sha256(master.secret(), salt, params.iterations);
    let cipher = Aes256Gcm::new_from_slice(&okm)
        .map_err(|e| HushError::EncryptionFailed(format!("AES-256-GCM key init: {e}")));
    okm.zeroize();
    Ok(MessageKey { cipher: cipher? })
}

pub(crate) fn pbkdf2_sha256(password: &[u8], salt: &[u8], iterations: u32) -> [u8; KEY_SIZE] {
    let mut out = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MasterKey;

    const FAST: KdfParams = KdfParams { iterations: 1_000 };

    #[test]
    fn test_pbkdf2_rfc7914_vector() {
        // RFC 7914 §11: PBKDF2-HMAC-SHA256("passwd", "salt", c=1, dkLen=64), first 32 bytes
        let out = pbkdf2_sha256(b"passwd", b"salt", 1);
        assert_eq!(out[..8], [0x55, 0xac, 0x04, 0x6e, 0x56, 0xe3, 0x08, 0x9f]);
    }

    #[test]
    fn test_deterministic_per_salt() {
        let master = MasterKey::from_bytes([1u8; KEY_SIZE]);
        let a = pbkdf2_sha256(master.as_bytes(), &[7u8; SALT_SIZE], FAST.iterations);
        let b = pbkdf2_sha256(master.as_bytes(), &[7u8; SALT_SIZE], FAST.iterations);
        let c = pbkdf2_sha256(master.as_bytes(), &[8u8; SALT_SIZE], FAST.iterations);

        assert_eq!(a, b, "KDF must be deterministic");
        assert_ne!(a, c, "different salts must produce different keys");
    }

    #[test]
    fn test_derive_message_key() {
        let handle = MasterKeyHandle::current(MasterKey::from_bytes([1u8; KEY_SIZE]));
        assert!(derive_message_key(&handle, &[0u8; SALT_SIZE], &FAST).is_ok());
    }

    #[test]
    fn test_params_minimum() {
        assert!(KdfParams::new(999).is_err());
        assert_eq!(KdfParams::new(1_000).unwrap(), FAST);
        assert_eq!(KdfParams::default().iterations, 100_000);
    }
}
