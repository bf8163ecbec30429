//! Envelope layout and the heuristics that tell envelopes from plaintext.
//!
//! ```text
//! [16 bytes: salt][12 bytes: nonce][N bytes: ciphertext + 16-byte tag]
//! ```
//!
//! There is no magic number or version byte: stored records written before
//! encryption existed are plain text, so classification is by shape only.

use hush_core::{HushError, HushResult};

use crate::codec::{decode, is_codec_text};
use crate::{HEADER_SIZE, NONCE_SIZE, SALT_SIZE, TAG_SIZE};

/// Smallest envelope that `seal_envelope` can produce (one byte of plaintext).
pub const MIN_SEALED_SIZE: usize = HEADER_SIZE + 1 + TAG_SIZE;

/// Encoded length of `MIN_SEALED_SIZE` bytes. Shorter text is never flagged
/// as "still encrypted".
pub const MIN_SEALED_TEXT_LEN: usize = MIN_SEALED_SIZE.div_ceil(3) * 4;

/// A decoded envelope. Created per encrypt call; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub salt: [u8; SALT_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
}

/// Concatenate `salt || nonce || ciphertext`.
pub fn pack(salt: &[u8; SALT_SIZE], nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
    out.extend_from_slice(salt);
    out.extend_from_slice(nonce);
    out.extend_from_slice(ciphertext);
    out
}

/// Split packed bytes back into their parts. Exact inverse of [`pack`].
pub fn unpack(bytes: &[u8]) -> HushResult<Envelope> {
    if bytes.len() < HEADER_SIZE {
        return Err(HushError::EnvelopeTooShort {
            len: bytes.len(),
            min: HEADER_SIZE,
        });
    }

    let (salt, rest) = bytes.split_at(SALT_SIZE);
    let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

    let mut envelope = Envelope {
        salt: [0u8; SALT_SIZE],
        nonce: [0u8; NONCE_SIZE],
        ciphertext: ciphertext.to_vec(),
    };
    envelope.salt.copy_from_slice(salt);
    envelope.nonce.copy_from_slice(nonce);
    Ok(envelope)
}

impl Envelope {
    pub fn to_bytes(&self) -> Vec<u8> {
        pack(&self.salt, &self.nonce, &self.ciphertext)
    }

    pub fn to_text(&self) -> String {
        crate::codec::encode(&self.to_bytes())
    }

    /// Decode and unpack in one step.
    pub fn from_text(text: &str) -> HushResult<Self> {
        unpack(&decode(text)?)
    }
}

/// Internal classifier: valid codec text that decodes to at least a header.
///
/// A heuristic. Ambiguous input is treated as plaintext; this never panics.
pub fn is_likely_envelope(text: &str) -> bool {
    decoded_len(text).is_some_and(|len| len >= HEADER_SIZE)
}

/// UI-facing check for records that still look sealed after a decrypt pass.
///
/// Stricter than [`is_likely_envelope`]: the text must be long enough to hold
/// a real sealed message, so short plaintext is never reported as
/// undecryptable.
pub fn is_still_encrypted(text: &str) -> bool {
    text.len() >= MIN_SEALED_TEXT_LEN
        && decoded_len(text).is_some_and(|len| len >= MIN_SEALED_SIZE)
}

fn decoded_len(text: &str) -> Option<usize> {
    if text.is_empty() || !is_codec_text(text) {
        return None;
    }
    decode(text).ok().map(|bytes| bytes.len())
}
