//! Prometheus counters for the vault.
//!
//! Registered into a caller-supplied registry; the application decides where
//! (or whether) to expose it.

use hush_keystore::ProvisionOutcome;
use prometheus_client::{
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

use crate::outcome::DecryptOutcome;

type Labels = Vec<(String, String)>;

#[derive(Clone, Default)]
pub struct VaultMetrics {
    encrypts: Counter,
    decrypts: Family<Labels, Counter>,
    provisions: Family<Labels, Counter>,
    regenerations: Counter,
}

impl VaultMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let metrics = Self::default();

        registry.register(
            "hush_encrypt",
            "Messages sealed into envelopes",
            metrics.encrypts.clone(),
        );
        registry.register(
            "hush_decrypt",
            "Decrypt calls by outcome",
            metrics.decrypts.clone(),
        );
        registry.register(
            "hush_key_provision",
            "Master key provisioning round-trips by outcome",
            metrics.provisions.clone(),
        );
        registry.register(
            "hush_key_regenerated",
            "Corrupted master keys discarded and regenerated (prior data unrecoverable)",
            metrics.regenerations.clone(),
        );

        metrics
    }

    pub(crate) fn record_encrypt(&self) {
        self.encrypts.inc();
    }

    pub(crate) fn record_decrypt(&self, outcome: &DecryptOutcome) {
        self.decrypts
            .get_or_create(&vec![("outcome".to_string(), outcome.label().to_string())])
            .inc();
    }

    pub(crate) fn record_provision(&self, outcome: ProvisionOutcome) {
        let label = match outcome {
            ProvisionOutcome::Loaded => "loaded",
            ProvisionOutcome::Created => "created",
            ProvisionOutcome::Regenerated { .. } => {
                self.regenerations.inc();
                "regenerated"
            }
        };
        self.provisions
            .get_or_create(&vec![("outcome".to_string(), label.to_string())])
            .inc();
    }
}
