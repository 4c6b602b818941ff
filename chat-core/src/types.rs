use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A direct message. Only `is_read` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: String,
    pub receiver: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl Message {
    /// True when the message belongs to the conversation between `a` and `b`, in either direction.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.sender == a && self.receiver == b) || (self.sender == b && self.receiver == a)
    }

    pub fn involves(&self, user: &str) -> bool {
        self.sender == user || self.receiver == user
    }

    /// The participant that is not `user`. For a self-message this is `user` again.
    pub fn counterpart(&self, user: &str) -> &str {
        if self.sender == user {
            &self.receiver
        } else {
            &self.sender
        }
    }
}

/// One row of the recent-chat index, keyed by (`user_id`, `contact_id`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChatEntry {
    pub user_id: String,
    pub contact_id: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

impl RecentChatEntry {
    pub fn is_keyed(&self, owner: &str, contact: &str) -> bool {
        self.user_id == owner && self.contact_id == contact
    }
}

/// Per-contact summary recomputed from the message log. Carries no read flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub user_id: String,
    pub last_message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

impl User {
    /// Copy safe to hand back to clients.
    pub fn without_password(&self) -> User {
        User {
            user_id: self.user_id.clone(),
            password: String::new(),
            email: self.email.clone(),
        }
    }
}

/// Reads a missing or `null` array as empty.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// On-disk layout of `chats.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatsData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<Message>,
}

/// On-disk layout of `recentChats.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecentChatsData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub chats: Vec<RecentChatEntry>,
}

/// On-disk layout of `users.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<User>,
}
