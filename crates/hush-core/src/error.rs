use std::sync::Arc;

use thiserror::Error;

pub type HushResult<T> = Result<T, HushError>;

#[derive(Debug, Error)]
pub enum HushError {
    #[error("malformed encoding: {0}")]
    MalformedEncoding(String),

    #[error("envelope too short: {len} bytes (minimum {min})")]
    EnvelopeTooShort { len: usize, min: usize },

    #[error("invalid key length: {0} bytes (expected 32)")]
    InvalidKeyLength(usize),

    #[error("no key found for user {0}")]
    NoKeyFound(String),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// The authentication tag did not verify. The envelope was sealed under a
    /// different key or scheme generation; this is not an I/O failure.
    #[error("decryption scheme mismatch: authentication tag rejected")]
    DecryptionSchemeMismatch,

    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HushError {
    /// Recover an owned error from one shared between coalesced waiters.
    ///
    /// The last holder gets the original variant back; everyone else sees the
    /// failure as a key store error carrying the same message.
    pub fn from_shared(err: Arc<HushError>) -> Self {
        match Arc::try_unwrap(err) {
            Ok(inner) => inner,
            Err(shared) => HushError::KeyStore(shared.to_string()),
        }
    }

    /// True for failures that mean "wrong key or wrong scheme", as opposed to
    /// transport, storage, or encoding problems.
    pub fn is_scheme_mismatch(&self) -> bool {
        matches!(self, HushError::DecryptionSchemeMismatch)
    }
}
