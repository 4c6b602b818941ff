use std::path::PathBuf;
use tracing;

use crate::error::{StoreError, StoreResult};
use crate::storage::{JsonDocument, StorageBackend};
use crate::types::{User, UsersData};

/// Registered users, persisted to `users.json`.
///
/// Passwords are stored and compared as plain text.
pub struct UserDirectory {
    doc: JsonDocument<UsersData>,
}

impl UserDirectory {
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
            doc: JsonDocument::in_memory("memory:users"),
        }
    }

    /// Adds `user` unless the id is taken. Returns whether the user was added.
    pub async fn register(&self, user: User) -> StoreResult<bool> {
        if user.user_id.trim().is_empty() {
            return Err(StoreError::validation("User ID is required"));
        }

        let user_id = user.user_id.clone();
        let added = self
            .doc
            .update(move |data| {
                if data.users.iter().any(|u| u.user_id == user.user_id) {
                    return (false, false);
                }
                data.users.push(user);
                (true, true)
            })
            .await?;

        if added {
            tracing::info!("User registered successfully: {}", user_id);
        } else {
            tracing::info!("User already exists: {}", user_id);
        }

        Ok(added)
    }

    pub async fn authenticate(&self, user_id: &str, password: &str) -> StoreResult<Option<User>> {
        let data = self.doc.read().await?;

        let found = data
            .users
            .into_iter()
            .find(|u| u.user_id == user_id && u.password == password);

        match &found {
            Some(user) => tracing::info!("User authenticated: {}", user.user_id),
            None => tracing::info!("Login failed for: {}", user_id),
        }

        Ok(found)
    }

    /// Case-insensitive substring match on the user id. Passwords are stripped.
    pub async fn search(&self, term: &str) -> StoreResult<Vec<User>> {
        let needle = term.to_lowercase();
        let data = self.doc.read().await?;

        Ok(data
            .users
            .iter()
            .filter(|u| u.user_id.to_lowercase().contains(&needle))
            .map(User::without_password)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, password: &str) -> User {
        User {
            user_id: id.to_string(),
            password: password.to_string(),
            email: format!("{}@example.com", id.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let users = UserDirectory::in_memory();

        assert!(users.register(user("alice", "pw")).await.unwrap());
        assert!(!users.register(user("alice", "other")).await.unwrap());

        // The first registration wins.
        assert!(users.authenticate("alice", "pw").await.unwrap().is_some());
        assert!(users.authenticate("alice", "other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_requires_user_id() {
        let users = UserDirectory::in_memory();
        let err = users.register(user("  ", "pw")).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_authenticate_without_users_file() {
        let dir = tempfile::tempdir().unwrap();
        let users = UserDirectory::file(dir.path().join("users.json"));

        assert!(users.authenticate("alice", "pw").await.unwrap().is_none());
        assert!(!dir.path().join("users.json").exists());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_strips_passwords() {
        let users = UserDirectory::in_memory();
        for id in ["Alice", "alicia", "bob"] {
            users.register(user(id, "secret")).await.unwrap();
        }

        let found = users.search("ALI").await.unwrap();
        let ids: Vec<&str> = found.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["Alice", "alicia"]);
        assert!(found.iter().all(|u| u.password.is_empty()));

        assert_eq!(users.search("").await.unwrap().len(), 3);
    }
}
