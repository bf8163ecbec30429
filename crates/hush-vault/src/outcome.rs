/// Shown in place of content that could not be decrypted
pub const UNDECRYPTABLE_PLACEHOLDER: &str = "[could not decrypt]";

/// Result of a decrypt call that did not fail outright.
///
/// Every variant carries text the caller can keep; only `Decrypted` is
/// plaintext recovered from an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecryptOutcome {
    /// The envelope authenticated and decrypted
    Decrypted(String),
    /// The input was not an envelope (empty, or written before encryption
    /// existed) and is returned unchanged
    PassthroughPlaintext(String),
    /// The input looks like an envelope but no known key authenticates it.
    /// The original input is returned unchanged.
    SchemeMismatch(String),
}

impl DecryptOutcome {
    pub fn text(&self) -> &str {
        match self {
            DecryptOutcome::Decrypted(t)
            | DecryptOutcome::PassthroughPlaintext(t)
            | DecryptOutcome::SchemeMismatch(t) => t,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            DecryptOutcome::Decrypted(t)
            | DecryptOutcome::PassthroughPlaintext(t)
            | DecryptOutcome::SchemeMismatch(t) => t,
        }
    }

    pub fn is_undecryptable(&self) -> bool {
        matches!(self, DecryptOutcome::SchemeMismatch(_))
    }

    /// Text fit for display: the placeholder instead of raw ciphertext.
    pub fn display_text(&self) -> &str {
        match self {
            DecryptOutcome::SchemeMismatch(_) => UNDECRYPTABLE_PLACEHOLDER,
            other => other.text(),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            DecryptOutcome::Decrypted(_) => "decrypted",
            DecryptOutcome::PassthroughPlaintext(_) => "passthrough",
            DecryptOutcome::SchemeMismatch(_) => "scheme_mismatch",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_hides_ciphertext() {
        let outcome = DecryptOutcome::SchemeMismatch("AAAA".into());
        assert_eq!(outcome.display_text(), UNDECRYPTABLE_PLACEHOLDER);
        assert_eq!(outcome.text(), "AAAA");
        assert!(outcome.is_undecryptable());
    }

    #[test]
    fn test_display_passes_plaintext() {
        assert_eq!(DecryptOutcome::Decrypted("hi".into()).display_text(), "hi");
        assert_eq!(
            DecryptOutcome::PassthroughPlaintext("old note".into()).into_text(),
            "old note"
        );
    }
}
