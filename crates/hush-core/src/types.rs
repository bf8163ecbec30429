use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat record as exchanged with the surrounding application.
///
/// Only `content` is ever transformed; `id` and `role` pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Same record with `content` replaced.
    pub fn with_content(&self, content: String) -> Self {
        Self {
            id: self.id.clone(),
            role: self.role,
            content,
        }
    }
}

/// How the master key behind an envelope was obtained.
///
/// Envelopes carry no version tag, so the generation can only be established
/// by which key authenticates the ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchemeGeneration {
    /// Random 256-bit key persisted per user on the device (current)
    RandomPersisted,
    /// Key derived from the user id under a fixed application salt
    FixedSalt,
    /// Key derived from the session's authentication token
    TokenDerived,
}

impl SchemeGeneration {
    pub fn is_current(&self) -> bool {
        matches!(self, SchemeGeneration::RandomPersisted)
    }
}

impl std::fmt::Display for SchemeGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SchemeGeneration::RandomPersisted => "random-persisted",
            SchemeGeneration::FixedSalt => "fixed-salt",
            SchemeGeneration::TokenDerived => "token-derived",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_content_preserves_other_fields() {
        let msg = ChatMessage {
            id: "m-1".into(),
            role: Role::Assistant,
            content: "hi".into(),
        };
        let replaced = msg.with_content("sealed".into());
        assert_eq!(replaced.id, "m-1");
        assert_eq!(replaced.role, Role::Assistant);
        assert_eq!(replaced.content, "sealed");
    }

    #[test]
    fn test_scheme_generation_names() {
        assert_eq!(SchemeGeneration::FixedSalt.to_string(), "fixed-salt");
        assert!(SchemeGeneration::RandomPersisted.is_current());
        assert!(!SchemeGeneration::TokenDerived.is_current());
    }
}
