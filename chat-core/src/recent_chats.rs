use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing;

use crate::error::StoreResult;
use crate::storage::{JsonDocument, StorageBackend};
use crate::types::{RecentChatEntry, RecentChatsData};

/// One summary row per (owner, contact), persisted to `recentChats.json`.
pub struct RecentChatIndex {
    doc: JsonDocument<RecentChatsData>,
}

/// Create-or-overwrite of the (owner, contact) row. Every index mutation that
/// writes content goes through here.
fn upsert_entry(
    data: &mut RecentChatsData,
    owner: &str,
    contact: &str,
    content: &str,
    timestamp: DateTime<Utc>,
    is_read: bool,
) {
    match data.chats.iter_mut().find(|c| c.is_keyed(owner, contact)) {
        Some(entry) => {
            entry.last_message = content.to_string();
            entry.timestamp = timestamp;
            entry.is_read = is_read;
        }
        None => data.chats.push(RecentChatEntry {
            user_id: owner.to_string(),
            contact_id: contact.to_string(),
            last_message: content.to_string(),
            timestamp,
            is_read,
        }),
    }
}

impl RecentChatIndex {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            doc: JsonDocument::new(backend),
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            doc: JsonDocument::file(path),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            doc: JsonDocument::in_memory("memory:recentChats"),
        }
    }

    pub async fn upsert(
        &self,
        owner: &str,
        contact: &str,
        content: &str,
        timestamp: DateTime<Utc>,
        is_read: bool,
    ) -> StoreResult<()> {
        self.doc
            .update(|data| {
                upsert_entry(data, owner, contact, content, timestamp, is_read);
                ((), true)
            })
            .await
    }

    /// Records a sent message from both perspectives in one rewrite.
    ///
    /// The sender's own row is read; the receiver's row is unread. For a
    /// self-message both land on the same row and the receiver side wins.
    pub async fn record_send(
        &self,
        sender: &str,
        receiver: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.doc
            .update(|data| {
                upsert_entry(data, sender, receiver, content, timestamp, true);
                upsert_entry(data, receiver, sender, content, timestamp, false);
                ((), true)
            })
            .await?;

        tracing::debug!("Recent chats updated for {} and {}", sender, receiver);
        Ok(())
    }

    /// Flags the (owner, contact) row as read. Returns whether a row changed;
    /// a missing row is not an error.
    pub async fn record_read(&self, owner: &str, contact: &str) -> StoreResult<bool> {
        self.doc
            .update_existing(|data| {
                match data.chats.iter_mut().find(|c| c.is_keyed(owner, contact)) {
                    Some(entry) if !entry.is_read => {
                        entry.is_read = true;
                        (true, true)
                    }
                    _ => (false, false),
                }
            })
            .await
    }

    /// Rows owned by `owner`, newest first. Equal timestamps keep storage order.
    pub async fn query_for(&self, owner: &str) -> StoreResult<Vec<RecentChatEntry>> {
        let data = self.doc.read().await?;

        let mut chats: Vec<RecentChatEntry> = data
            .chats
            .into_iter()
            .filter(|c| c.user_id == owner)
            .collect();
        chats.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(chats)
    }
}
