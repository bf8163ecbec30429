//! Batch variants over chat records. Only `content` changes; `id` and `role`
//! pass through untouched and order is preserved.

use futures::future::try_join_all;
use hush_core::{ChatMessage, HushError, HushResult};

use crate::engine::Vault;

impl Vault {
    /// Seal the content of every message. Fails as a whole if any one fails.
    pub async fn encrypt_messages(
        &self,
        messages: &[ChatMessage],
        user_id: &str,
    ) -> HushResult<Vec<ChatMessage>> {
        try_join_all(messages.iter().map(|msg| async move {
            let sealed = self.encrypt_message(&msg.content, user_id).await?;
            Ok::<_, HushError>(msg.with_content(sealed))
        }))
        .await
    }

    /// Decrypt the content of every message.
    ///
    /// Records that cannot be decrypted keep their original content; flag them
    /// for display with [`crate::is_still_encrypted`].
    pub async fn decrypt_messages(
        &self,
        messages: &[ChatMessage],
        user_id: &str,
    ) -> HushResult<Vec<ChatMessage>> {
        try_join_all(messages.iter().map(|msg| async move {
            let outcome = self.decrypt_message(&msg.content, user_id).await?;
            Ok::<_, HushError>(msg.with_content(outcome.into_text()))
        }))
        .await
    }
}
