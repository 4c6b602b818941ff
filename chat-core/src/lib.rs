pub mod config;
pub mod context;
pub mod error;
pub mod message_store;
pub mod recent_chats;
pub mod storage;
pub mod types;
pub mod users;

pub use config::Config;
pub use context::ChatContext;
pub use error::{StoreError, StoreResult};
pub use message_store::MessageStore;
pub use recent_chats::RecentChatIndex;
pub use storage::{FileBackend, JsonDocument, MemoryBackend, StorageBackend};
pub use types::{ContactSummary, Message, RecentChatEntry, User};
pub use users::UserDirectory;
