use chrono::{TimeDelta, Utc};
use std::path::PathBuf;
use tracing;

use crate::error::StoreResult;
use crate::storage::{JsonDocument, StorageBackend};
use crate::types::{ChatsData, Message};

/// Append-only message log persisted to `chats.json`.
///
/// Storage order is chronological order: every appended message carries a
/// timestamp strictly later than the one before it.
pub struct MessageStore {
    doc: JsonDocument<ChatsData>,
}

impl MessageStore {
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
            doc: JsonDocument::in_memory("memory:chats"),
        }
    }

    pub async fn append(&self, sender: &str, receiver: &str, content: &str) -> StoreResult<Message> {
        tracing::debug!("Storing message: {} -> {}: {}", sender, receiver, content);

        self.doc
            .update(|data| {
                let mut timestamp = Utc::now();
                if let Some(last) = data.messages.last() {
                    if timestamp <= last.timestamp {
                        timestamp = last.timestamp + TimeDelta::microseconds(1);
                    }
                }

                let message = Message {
                    sender: sender.to_string(),
                    receiver: receiver.to_string(),
                    content: content.to_string(),
                    timestamp,
                    is_read: false,
                };
                data.messages.push(message.clone());

                tracing::debug!("Current number of messages: {}", data.messages.len());
                (message, true)
            })
            .await
    }

    /// Conversation between `user_a` and `user_b`, both directions, in storage order.
    pub async fn query(&self, user_a: &str, user_b: &str) -> StoreResult<Vec<Message>> {
        let data = self.doc.read().await?;

        Ok(data
            .messages
            .into_iter()
            .filter(|m| m.is_between(user_a, user_b))
            .collect())
    }

    /// Every message sent or received by `user`, in storage order.
    pub async fn query_all_for(&self, user: &str) -> StoreResult<Vec<Message>> {
        let data = self.doc.read().await?;

        Ok(data
            .messages
            .into_iter()
            .filter(|m| m.involves(user))
            .collect())
    }

    /// Marks every unread message from `contact` to `owner` as read and returns
    /// how many changed. The log is only rewritten when that number is non-zero.
    pub async fn mark_read(&self, contact: &str, owner: &str) -> StoreResult<usize> {
        self.doc
            .update_existing(|data| {
                let mut marked = 0;
                for message in data
                    .messages
                    .iter_mut()
                    .filter(|m| m.sender == contact && m.receiver == owner && !m.is_read)
                {
                    message.is_read = true;
                    marked += 1;
                }
                (marked, marked > 0)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_returns_pair_in_append_order() {
        let store = MessageStore::in_memory();
        store.append("alice", "bob", "1").await.unwrap();
        store.append("alice", "carol", "x").await.unwrap();
        store.append("bob", "alice", "2").await.unwrap();
        store.append("carol", "bob", "y").await.unwrap();
        store.append("alice", "bob", "3").await.unwrap();

        let contents: Vec<String> = store
            .query("bob", "alice")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let store = MessageStore::in_memory();
        for i in 0..20 {
            store.append("alice", "bob", &i.to_string()).await.unwrap();
        }

        let messages = store.query_all_for("alice").await.unwrap();
        assert_eq!(messages.len(), 20);
        assert!(messages.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!(messages.iter().all(|m| !m.is_read));
    }

    #[tokio::test]
    async fn test_query_all_for_includes_both_directions_and_self() {
        let store = MessageStore::in_memory();
        store.append("alice", "bob", "a").await.unwrap();
        store.append("carol", "alice", "b").await.unwrap();
        store.append("alice", "alice", "c").await.unwrap();
        store.append("bob", "carol", "d").await.unwrap();

        let contents: Vec<String> = store
            .query_all_for("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(store.query("alice", "alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_only_touches_contact_to_owner() {
        let store = MessageStore::in_memory();
        store.append("alice", "bob", "to bob").await.unwrap();
        store.append("bob", "alice", "to alice").await.unwrap();
        store.append("bob", "alice", "again").await.unwrap();

        assert_eq!(store.mark_read("bob", "alice").await.unwrap(), 2);
        assert_eq!(store.mark_read("bob", "alice").await.unwrap(), 0);

        let messages = store.query("alice", "bob").await.unwrap();
        assert!(!messages[0].is_read);
        assert!(messages[1].is_read);
        assert!(messages[2].is_read);
    }

    #[tokio::test]
    async fn test_missing_log_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.json");
        let store = MessageStore::file(&path);

        assert!(store.query("alice", "bob").await.unwrap().is_empty());
        assert!(store.query_all_for("alice").await.unwrap().is_empty());
        assert_eq!(store.mark_read("bob", "alice").await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_log_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chats.json");

        let sent = MessageStore::file(&path)
            .append("alice", "bob", "persisted")
            .await
            .unwrap();

        let reopened = MessageStore::file(&path);
        let messages = reopened.query("alice", "bob").await.unwrap();
        assert_eq!(messages, vec![sent]);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["messages"][0]["isRead"], serde_json::json!(false));
    }
}
