//! hush-vault: the encryption surface the application talks to
//!
//! ```text
//! encrypt_message(text, user)
//!   → KeyCache::provision(user) → master key handle
//!   → random salt + nonce → PBKDF2 message key → AES-256-GCM
//!   → base64(salt || nonce || ciphertext)
//!
//! decrypt_message(text, user)
//!   → not envelope-shaped?         PassthroughPlaintext(text)
//!   → current key, then legacy schemes in configured order
//!   → first tag that verifies:     Decrypted(plaintext)
//!   → none verify:                 SchemeMismatch(text)
//! ```

pub mod backup;
pub mod engine;
pub mod messages;
pub mod metrics;
pub mod outcome;

pub use backup::{ExportedKey, ImportReport, KeyStatus, OverwriteConfirmed, EXPORT_WARNING};
pub use engine::Vault;
pub use metrics::VaultMetrics;
pub use outcome::{DecryptOutcome, UNDECRYPTABLE_PLACEHOLDER};

/// UI-facing check: does this text still look like a sealed envelope?
///
/// Conservative by design of its threshold: text shorter than the smallest
/// possible sealed message is never flagged.
pub fn is_still_encrypted(text: &str) -> bool {
    hush_crypto::is_still_encrypted(text)
}
