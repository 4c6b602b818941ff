use chat_core::{
    ChatContext, ContactSummary, Message, RecentChatEntry, StoreError, StoreResult,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing;

use crate::summary::summarize_contacts;

/// Every message a user took part in, plus the per-contact summary derived from them.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMessages {
    pub messages: Vec<Message>,
    pub recent_chats: Vec<ContactSummary>,
}

/// Keeps the message log and the recent-chat index consistent with each other.
///
/// Send and mark-read touch both stores. They run one at a time behind a
/// shared gate, taken before either store lock, so two sends cannot land in
/// the log in one order and in the index in the other.
#[derive(Clone)]
pub struct MessagingService {
    ctx: ChatContext,
    gate: Arc<Mutex<()>>,
}

impl MessagingService {
    pub fn new(ctx: ChatContext) -> Self {
        Self {
            ctx,
            gate: Arc::new(Mutex::new(())),
        }
    }

    pub async fn send_message(
        &self,
        sender: &str,
        receiver: &str,
        content: &str,
    ) -> StoreResult<Message> {
        require("Sender", sender)?;
        require("Receiver", receiver)?;

        let _gate = self.gate.lock().await;

        let message = self.ctx.messages.append(sender, receiver, content).await?;
        self.ctx
            .recent_chats
            .record_send(sender, receiver, content, message.timestamp)
            .await?;

        tracing::info!("Message stored successfully: {} -> {}", sender, receiver);
        Ok(message)
    }

    /// Marks everything `contact` sent to `owner` as read and, if anything
    /// changed, flags `owner`'s recent-chat row for `contact` as read too.
    pub async fn mark_read(&self, owner: &str, contact: &str) -> StoreResult<usize> {
        require("User", owner)?;
        require("Contact", contact)?;

        let _gate = self.gate.lock().await;

        let marked = self.ctx.messages.mark_read(contact, owner).await?;
        if marked > 0 {
            self.ctx.recent_chats.record_read(owner, contact).await?;
            tracing::info!("Marked {} messages from {} to {} as read", marked, contact, owner);
        }

        Ok(marked)
    }

    pub async fn conversation(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<Message>> {
        require("User", user_a)?;
        require("User", user_b)?;

        let messages = self.ctx.messages.query(user_a, user_b).await?;
        tracing::debug!("Found {} messages between {} and {}", messages.len(), user_a, user_b);

        Ok(messages)
    }

    pub async fn all_messages(&self, user: &str) -> StoreResult<UserMessages> {
        require("User", user)?;

        let messages = self.ctx.messages.query_all_for(user).await?;
        let recent_chats = summarize_contacts(user, &messages);
        tracing::debug!("Found {} recent chats for user {}", recent_chats.len(), user);

        Ok(UserMessages {
            messages,
            recent_chats,
        })
    }

    pub async fn recent_chats(&self, owner: &str) -> StoreResult<Vec<RecentChatEntry>> {
        require("User", owner)?;

        self.ctx.recent_chats.query_for(owner).await
    }
}

fn require(field: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::validation(format!("{} ID is required", field)));
    }
    Ok(())
}
