//! Encrypt/decrypt orchestration.

use std::sync::Arc;

use hush_core::config::CryptoConfig;
use hush_core::{HushConfig, HushError, HushResult, SchemeGeneration};
use hush_crypto::{
    is_likely_envelope, legacy_master_key, open_envelope, seal_envelope, user_tag, Envelope,
    KdfParams, MasterKeyHandle,
};
use hush_keystore::{open_store, KeyCache, KeyStore};
use prometheus_client::registry::Registry;
use zeroize::Zeroizing;

use crate::metrics::VaultMetrics;
use crate::outcome::DecryptOutcome;

/// Encrypts and decrypts user text. Owns the key cache; share it behind an
/// `Arc` rather than constructing one per call.
pub struct Vault {
    pub(crate) cache: Arc<KeyCache>,
    params: KdfParams,
    legacy: Vec<SchemeGeneration>,
    metrics: Option<VaultMetrics>,
}

impl Vault {
    pub fn new(store: Arc<dyn KeyStore>, crypto: &CryptoConfig) -> HushResult<Self> {
        Self::build(store, crypto, None)
    }

    /// Like [`Vault::new`], with counters registered into `registry`.
    pub fn with_registry(
        store: Arc<dyn KeyStore>,
        crypto: &CryptoConfig,
        registry: &mut Registry,
    ) -> HushResult<Self> {
        Self::build(store, crypto, Some(VaultMetrics::new(registry)))
    }

    /// Open the configured key store backend and build a vault on it.
    pub fn from_config(config: &HushConfig) -> HushResult<Self> {
        config.validate()?;
        Self::new(open_store(&config.keystore), &config.crypto)
    }

    fn build(
        store: Arc<dyn KeyStore>,
        crypto: &CryptoConfig,
        metrics: Option<VaultMetrics>,
    ) -> HushResult<Self> {
        let params = KdfParams::new(crypto.kdf_iterations)?;
        let legacy: Vec<_> = crypto
            .legacy_schemes
            .iter()
            .copied()
            .filter(|s| !s.is_current())
            .collect();

        let mut cache = KeyCache::new(store);
        if let Some(m) = metrics.clone() {
            cache = cache.with_hook(Arc::new(move |outcome| m.record_provision(outcome)));
        }

        Ok(Self {
            cache: Arc::new(cache),
            params,
            legacy,
            metrics,
        })
    }

    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        self.cache.store()
    }

    /// Seal `plaintext` for `user_id`. Empty input is returned unchanged.
    ///
    /// Any failure is an [`HushError::EncryptionFailed`]; there is no
    /// plaintext fallback.
    pub async fn encrypt_message(&self, plaintext: &str, user_id: &str) -> HushResult<String> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let handle = self
            .cache
            .provision(user_id)
            .await
            .map_err(|e| HushError::EncryptionFailed(format!("provisioning master key: {e}")))?;

        let params = self.params;
        let bytes = Zeroizing::new(plaintext.as_bytes().to_vec());
        let envelope = tokio::task::spawn_blocking(move || seal_envelope(&handle, &bytes, &params))
            .await
            .map_err(|e| HushError::EncryptionFailed(format!("seal task: {e}")))?
            .map_err(|e| match e {
                HushError::EncryptionFailed(_) => e,
                other => HushError::EncryptionFailed(other.to_string()),
            })?;

        if let Some(m) = &self.metrics {
            m.record_encrypt();
        }
        Ok(envelope.to_text())
    }

    /// Decrypt with the current scheme and any configured legacy schemes.
    ///
    /// Only storage or runtime failures are errors; anything about the input
    /// itself resolves to a [`DecryptOutcome`].
    pub async fn decrypt_message(&self, input: &str, user_id: &str) -> HushResult<DecryptOutcome> {
        self.decrypt_message_with_token(input, user_id, None).await
    }

    /// As [`Vault::decrypt_message`], also able to open token-derived
    /// envelopes sealed under `session_token`.
    pub async fn decrypt_message_with_token(
        &self,
        input: &str,
        user_id: &str,
        session_token: Option<&str>,
    ) -> HushResult<DecryptOutcome> {
        let outcome = self.decrypt_inner(input, user_id, session_token).await?;
        if let Some(m) = &self.metrics {
            m.record_decrypt(&outcome);
        }
        Ok(outcome)
    }

    async fn decrypt_inner(
        &self,
        input: &str,
        user_id: &str,
        session_token: Option<&str>,
    ) -> HushResult<DecryptOutcome> {
        if input.is_empty() || !is_likely_envelope(input) {
            tracing::trace!("input is not envelope-shaped; passing through");
            return Ok(DecryptOutcome::PassthroughPlaintext(input.to_string()));
        }

        let envelope = match Envelope::from_text(input) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("envelope-shaped input failed to unpack ({e}); passing through");
                return Ok(DecryptOutcome::PassthroughPlaintext(input.to_string()));
            }
        };

        let current = self.cache.provision(user_id).await?;
        let attempt = Attempt {
            envelope,
            current,
            legacy: self.legacy.clone(),
            user_id: user_id.to_string(),
            session_token: session_token.map(|t| Zeroizing::new(t.to_string())),
            params: self.params,
        };

        let opened = tokio::task::spawn_blocking(move || attempt.run())
            .await
            .map_err(|e| HushError::Other(anyhow::anyhow!("decrypt task: {e}")))??;

        match opened {
            Some((plaintext, scheme)) => {
                if !scheme.is_current() {
                    tracing::info!(
                        user = %user_tag(user_id),
                        scheme = %scheme,
                        "opened envelope sealed under a legacy scheme"
                    );
                }
                Ok(DecryptOutcome::Decrypted(plaintext))
            }
            None => {
                tracing::debug!(
                    user = %user_tag(user_id),
                    "no known scheme authenticates envelope; returning input unchanged"
                );
                Ok(DecryptOutcome::SchemeMismatch(input.to_string()))
            }
        }
    }
}

/// One decrypt attempt across scheme generations, run on the blocking pool.
struct Attempt {
    envelope: Envelope,
    current: MasterKeyHandle,
    legacy: Vec<SchemeGeneration>,
    user_id: String,
    session_token: Option<Zeroizing<String>>,
    params: KdfParams,
}

impl Attempt {
    /// `Ok(None)` means every scheme rejected the tag.
    fn run(self) -> HushResult<Option<(String, SchemeGeneration)>> {
        if let Some(text) = self.try_open(&self.current)? {
            return Ok(Some((text, self.current.scheme())));
        }

        for &scheme in &self.legacy {
            let token = self.session_token.as_ref().map(|t| t.as_str());
            let Some(handle) = legacy_master_key(scheme, &self.user_id, token, &self.params) else {
                tracing::debug!(scheme = %scheme, "legacy scheme not reconstructible; skipping");
                continue;
            };
            if let Some(text) = self.try_open(&handle)? {
                return Ok(Some((text, scheme)));
            }
        }
        Ok(None)
    }

    fn try_open(&self, handle: &MasterKeyHandle) -> HushResult<Option<String>> {
        match open_envelope(handle, &self.envelope, &self.params) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => Ok(Some(text)),
                Err(_) => {
                    // Authenticated but not text: not something this system sealed.
                    tracing::warn!(scheme = %handle.scheme(), "authenticated payload is not UTF-8");
                    Ok(None)
                }
            },
            Err(e) if e.is_scheme_mismatch() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
