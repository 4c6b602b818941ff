use anyhow::{anyhow, Result};
use std::sync::Arc;
use tracing;

use crate::config::Config;
use crate::message_store::MessageStore;
use crate::recent_chats::RecentChatIndex;
use crate::users::UserDirectory;

/// Store handles shared by every request. Built once at startup.
#[derive(Clone)]
pub struct ChatContext {
    pub config: Arc<Config>,
    pub messages: Arc<MessageStore>,
    pub recent_chats: Arc<RecentChatIndex>,
    pub users: Arc<UserDirectory>,
}

impl ChatContext {
    pub async fn new(config: Config) -> Result<Self> {
        let storage = &config.storage;

        tokio::fs::create_dir_all(&storage.data_dir)
            .await
            .map_err(|e| anyhow!("Failed to create data directory {}: {}", storage.data_dir.display(), e))?;

        tracing::info!("Messages stored at {}", storage.chats_path().display());
        tracing::info!("Recent chats stored at {}", storage.recent_chats_path().display());
        tracing::info!("Users stored at {}", storage.users_path().display());

        Ok(ChatContext {
            messages: Arc::new(MessageStore::file(storage.chats_path())),
            recent_chats: Arc::new(RecentChatIndex::file(storage.recent_chats_path())),
            users: Arc::new(UserDirectory::file(storage.users_path())),
            config: Arc::new(config),
        })
    }

    /// Context whose stores live only in memory.
    pub fn in_memory(config: Config) -> Self {
        ChatContext {
            config: Arc::new(config),
            messages: Arc::new(MessageStore::in_memory()),
            recent_chats: Arc::new(RecentChatIndex::in_memory()),
            users: Arc::new(UserDirectory::in_memory()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_creates_data_dir_and_file_stores() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let ctx = ChatContext::new(Config::with_data_dir(&data_dir)).await.unwrap();

        assert!(data_dir.is_dir());

        ctx.messages.append("alice", "bob", "hi").await.unwrap();
        assert!(data_dir.join("chats.json").exists());
        assert!(!data_dir.join("recentChats.json").exists());
    }
}
