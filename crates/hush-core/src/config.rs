use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HushError, HushResult};
use crate::types::SchemeGeneration;

/// Iteration count for per-message key derivation (PBKDF2-HMAC-SHA256)
pub const DEFAULT_KDF_ITERATIONS: u32 = 100_000;

/// Configured iteration counts below this are rejected
pub const MIN_KDF_ITERATIONS: u32 = 1_000;

/// Top-level configuration (loaded from hush.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HushConfig {
    pub keystore: KeyStoreConfig,
    pub crypto: CryptoConfig,
    pub log: LogConfig,
}

impl HushConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> HushResult<Self> {
        match Self::load_if_present(path)? {
            Some(config) => Ok(config),
            None => {
                tracing::warn!(
                    "config file not found: {}  (using defaults)",
                    path.display()
                );
                Ok(Self::default())
            }
        }
    }

    /// Load and validate `path`; `Ok(None)` if the file does not exist.
    pub fn load_if_present(path: &Path) -> HushResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let config: HushConfig = toml::from_str(&content)
            .map_err(|e| HushError::Config(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(Some(config))
    }

    pub fn validate(&self) -> HushResult<()> {
        if self.crypto.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(HushError::Config(format!(
                "crypto.kdf_iterations = {} is below the minimum of {MIN_KDF_ITERATIONS}",
                self.crypto.kdf_iterations
            )));
        }
        if self.crypto.legacy_schemes.contains(&SchemeGeneration::RandomPersisted) {
            return Err(HushError::Config(
                "crypto.legacy_schemes must not list the current scheme (random-persisted)".into(),
            ));
        }
        Ok(())
    }
}

/// Where master keys are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyStoreBackend {
    /// One 0600 file per user under `dir`
    File,
    /// Platform keychain (macOS Keychain, Secret Service, Credential Manager)
    Keychain,
    /// Process memory only; keys vanish on exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyStoreConfig {
    pub backend: KeyStoreBackend,
    /// Key directory for the file backend
    pub dir: PathBuf,
    /// Keychain service name for the keychain backend
    pub service: String,
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            backend: KeyStoreBackend::File,
            dir: default_data_dir().join("keys"),
            service: "hush".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA256 iterations for per-message keys (default: 100000)
    pub kdf_iterations: u32,
    /// Historical generations to try, in order, when the current key fails
    pub legacy_schemes: Vec<SchemeGeneration>,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            legacy_schemes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// `$XDG_DATA_HOME/hush`, or `~/.local/share/hush`
pub fn default_data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".local").join("share")
        })
        .join("hush")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[keystore]
backend = "keychain"
dir = "/var/lib/hush/keys"
service = "hush-test"

[crypto]
kdf_iterations = 200000
legacy_schemes = ["fixed-salt", "token-derived"]

[log]
level = "debug"
format = "json"
"#;
        let config: HushConfig = toml::from_str(toml_str).unwrap();
        config.validate().unwrap();

        assert_eq!(config.keystore.backend, KeyStoreBackend::Keychain);
        assert_eq!(config.keystore.dir, PathBuf::from("/var/lib/hush/keys"));
        assert_eq!(config.keystore.service, "hush-test");
        assert_eq!(config.crypto.kdf_iterations, 200_000);
        assert_eq!(
            config.crypto.legacy_schemes,
            vec![SchemeGeneration::FixedSalt, SchemeGeneration::TokenDerived]
        );
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: HushConfig = toml::from_str("").unwrap();

        assert_eq!(config.keystore.backend, KeyStoreBackend::File);
        assert_eq!(config.keystore.service, "hush");
        assert_eq!(config.crypto.kdf_iterations, DEFAULT_KDF_ITERATIONS);
        assert!(config.crypto.legacy_schemes.is_empty());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_rejects_weak_iterations() {
        let config: HushConfig = toml::from_str("[crypto]\nkdf_iterations = 10\n").unwrap();
        assert!(matches!(config.validate(), Err(HushError::Config(_))));
    }

    #[test]
    fn test_rejects_current_scheme_as_legacy() {
        let config: HushConfig =
            toml::from_str("[crypto]\nlegacy_schemes = [\"random-persisted\"]\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = HushConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.crypto.kdf_iterations, DEFAULT_KDF_ITERATIONS);
    }

    #[test]
    fn test_load_if_present_distinguishes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(HushConfig::load_if_present(&dir.path().join("absent.toml"))
            .unwrap()
            .is_none());

        let path = dir.path().join("hush.toml");
        std::fs::write(&path, "[crypto]\nkdf_iterations = 5000\n").unwrap();
        let config = HushConfig::load_if_present(&path).unwrap().unwrap();
        assert_eq!(config.crypto.kdf_iterations, 5000);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hush.toml");
        std::fs::write(&path, "[crypto\nkdf_iterations = ").unwrap();
        assert!(matches!(HushConfig::load(&path), Err(HushError::Config(_))));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = HushConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: HushConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.keystore.dir, parsed.keystore.dir);
        assert_eq!(config.crypto.kdf_iterations, parsed.crypto.kdf_iterations);
    }
}
