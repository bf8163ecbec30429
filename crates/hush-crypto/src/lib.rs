//! hush-crypto: client-side message encryption for hush
//!
//! Envelope (base64 of):
//! ```text
//! [16 bytes: salt][12 bytes: nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! Key hierarchy:
//! ```text
//! Master Key (256-bit, one per user, persisted on the device)
//!   └── Message Key (PBKDF2-HMAC-SHA256(master, salt), fresh salt per message)
//!       └── AES-256-GCM (key=message_key, nonce=random_96bit)
//! ```

pub mod cipher;
pub mod codec;
pub mod envelope;
pub mod kdf;
pub mod keys;
pub mod scheme;

pub use cipher::{open_envelope, seal_envelope};
pub use codec::{decode, encode};
pub use envelope::{is_likely_envelope, is_still_encrypted, pack, unpack, Envelope};
pub use kdf::{derive_message_key, KdfParams, MessageKey};
pub use keys::{user_tag, MasterKey, MasterKeyHandle};
pub use scheme::legacy_master_key;

/// Size of a master key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of the per-message PBKDF2 salt
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Salt and nonce prefix; anything shorter cannot be an envelope
pub const HEADER_SIZE: usize = SALT_SIZE + NONCE_SIZE;
