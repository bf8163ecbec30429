//! AES-256-GCM sealing of whole messages into envelopes.

use aes_gcm::{aead::Aead, Nonce};
use hush_core::{HushError, HushResult};
use rand::RngCore;

use crate::envelope::Envelope;
use crate::kdf::{derive_message_key, KdfParams, MessageKey};
use crate::keys::MasterKeyHandle;
use crate::{NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// Encrypt `plaintext` under a fresh salt and nonce.
///
/// Returns the envelope; callers encode it with [`Envelope::to_text`].
pub fn seal_envelope(
    master: &MasterKeyHandle,
    plaintext: &[u8],
    params: &KdfParams,
) -> HushResult<Envelope> {
    let mut salt = [0u8; SALT_SIZE];
    let mut nonce = [0u8; NONCE_SIZE];
    let mut rng = rand::thread_rng();
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut nonce);

    let key = derive_message_key(master, &salt, params)?;
    let ciphertext = seal(&key, &nonce, plaintext)?;

    Ok(Envelope {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt an envelope with the key derived from `master` and its salt.
///
/// A tag that fails to verify is reported as
/// [`HushError::DecryptionSchemeMismatch`].
pub fn open_envelope(
    master: &MasterKeyHandle,
    envelope: &Envelope,
    params: &KdfParams,
) -> HushResult<Vec<u8>> {
    if envelope.ciphertext.len() < TAG_SIZE {
        // Cannot carry a tag, so it cannot authenticate under any key.
        tracing::trace!(len = envelope.ciphertext.len(), "ciphertext shorter than the GCM tag");
        return Err(HushError::DecryptionSchemeMismatch);
    }
    let key = derive_message_key(master, &envelope.salt, params)?;
    open(&key, &envelope.nonce, &envelope.ciphertext)
}

/// Returns `ciphertext || tag`.
pub fn seal(key: &MessageKey, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> HushResult<Vec<u8>> {
    key.cipher()
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| HushError::EncryptionFailed(format!("AES-256-GCM seal: {e}")))
}

pub fn open(key: &MessageKey, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> HushResult<Vec<u8>> {
    key.cipher()
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| HushError::DecryptionSchemeMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::MasterKey;
    use crate::{HEADER_SIZE, KEY_SIZE};

    const FAST: KdfParams = KdfParams { iterations: 1_000 };

    fn handle(byte: u8) -> MasterKeyHandle {
        MasterKeyHandle::current(MasterKey::from_bytes([byte; KEY_SIZE]))
    }

    #[test]
    fn test_seal_open_roundtrip() {
        let master = handle(42);
        let envelope = seal_envelope(&master, b"hello, sealed world!", &FAST).unwrap();
        let opened = open_envelope(&master, &envelope, &FAST).unwrap();
        assert_eq!(opened, b"hello, sealed world!");
    }

    #[test]
    fn test_sealed_size() {
        let envelope = seal_envelope(&handle(1), &[0u8; 1000], &FAST).unwrap();
        // header (28) + plaintext (1000) + tag (16)
        assert_eq!(envelope.to_bytes().len(), HEADER_SIZE + 1000 + TAG_SIZE);
    }

    #[test]
    fn test_fresh_salt_and_nonce() {
        let master = handle(1);
        let a = seal_envelope(&master, b"same", &FAST).unwrap();
        let b = seal_envelope(&master, b"same", &FAST).unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.to_text(), b.to_text());
    }

    #[test]
    fn test_wrong_master_is_scheme_mismatch() {
        let envelope = seal_envelope(&handle(1), b"secret", &FAST).unwrap();
        let result = open_envelope(&handle(2), &envelope, &FAST);
        assert!(matches!(result, Err(HushError::DecryptionSchemeMismatch)));
    }

    #[test]
    fn test_wrong_iterations_is_scheme_mismatch() {
        let master = handle(1);
        let envelope = seal_envelope(&master, b"secret", &FAST).unwrap();
        let result = open_envelope(&master, &envelope, &KdfParams { iterations: 2_000 });
        assert!(matches!(result, Err(HushError::DecryptionSchemeMismatch)));
    }

    #[test]
    fn test_tampered_ciphertext() {
        let master = handle(1);
        let mut envelope = seal_envelope(&master, b"secret data", &FAST).unwrap();
        envelope.ciphertext[0] ^= 0xFF;
        assert!(open_envelope(&master, &envelope, &FAST).is_err());
    }

    #[test]
    fn test_tampered_salt() {
        let master = handle(1);
        let mut envelope = seal_envelope(&master, b"secret data", &FAST).unwrap();
        envelope.salt[0] ^= 0x01;
        assert!(matches!(
            open_envelope(&master, &envelope, &FAST),
            Err(HushError::DecryptionSchemeMismatch)
        ));
    }

    #[test]
    fn test_tagless_body_rejected_without_derivation() {
        let envelope = Envelope {
            salt: [0u8; SALT_SIZE],
            nonce: [0u8; NONCE_SIZE],
            ciphertext: vec![0u8; TAG_SIZE - 1],
        };
        assert!(matches!(
            open_envelope(&handle(1), &envelope, &FAST),
            Err(HushError::DecryptionSchemeMismatch)
        ));
    }
}
