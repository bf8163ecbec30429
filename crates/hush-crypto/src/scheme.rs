//! Master keys of historical scheme generations.
//!
//! Older clients never persisted a random key; they derived one on demand.
//! These derivations are only used to open old envelopes, never to seal.

use hush_core::SchemeGeneration;

use crate::kdf::{pbkdf2_sha256, KdfParams};
use crate::keys::{MasterKey, MasterKeyHandle};

/// Application-wide salt used by the fixed-salt generation.
const FIXED_SALT: &[u8; 16] = b"hush-fixed-salt1";

/// Rebuild the master key a legacy generation would have used for this user.
///
/// Returns `None` when the generation cannot be reconstructed: the current
/// generation lives in the key store, and the token-derived one needs the
/// session token that produced it.
pub fn legacy_master_key(
    scheme: SchemeGeneration,
    user_id: &str,
    session_token: Option<&str>,
    params: &KdfParams,
) -> Option<MasterKeyHandle> {
    let bytes = match scheme {
        SchemeGeneration::RandomPersisted => return None,
        SchemeGeneration::FixedSalt => {
            pbkdf2_sha256(user_id.as_bytes(), FIXED_SALT, params.iterations)
        }
        SchemeGeneration::TokenDerived => {
            let token = session_token?;
            pbkdf2_sha256(token.as_bytes(), user_id.as_bytes(), params.iterations)
        }
    };
    Some(MasterKeyHandle::new(MasterKey::from_bytes(bytes), scheme))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams { iterations: 1_000 };

    #[test]
    fn test_current_generation_not_derivable() {
        assert!(legacy_master_key(SchemeGeneration::RandomPersisted, "u1", None, &FAST).is_none());
    }

    #[test]
    fn test_fixed_salt_is_per_user_and_stable() {
        let a = legacy_master_key(SchemeGeneration::FixedSalt, "u1", None, &FAST).unwrap();
        let b = legacy_master_key(SchemeGeneration::FixedSalt, "u1", None, &FAST).unwrap();
        let c = legacy_master_key(SchemeGeneration::FixedSalt, "u2", None, &FAST).unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.scheme(), SchemeGeneration::FixedSalt);
    }

    #[test]
    fn test_token_derived_needs_token() {
        assert!(legacy_master_key(SchemeGeneration::TokenDerived, "u1", None, &FAST).is_none());

        let t1 =
            legacy_master_key(SchemeGeneration::TokenDerived, "u1", Some("tok-a"), &FAST).unwrap();
        let t2 =
            legacy_master_key(SchemeGeneration::TokenDerived, "u1", Some("tok-b"), &FAST).unwrap();
        assert_ne!(t1.fingerprint(), t2.fingerprint(), "tokens rotate the key");
    }
}
