use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub chats_file: String,
    pub recent_chats_file: String,
    pub users_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub api_port: u16,
    pub static_dir: PathBuf,
    pub templates_dir: PathBuf,
    pub cors_origins: Option<String>, // Comma-separated, permissive when unset
}

impl StorageConfig {
    pub fn chats_path(&self) -> PathBuf {
        self.data_dir.join(&self.chats_file)
    }

    pub fn recent_chats_path(&self) -> PathBuf {
        self.data_dir.join(&self.recent_chats_file)
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(&self.users_file)
    }
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        Config {
            storage: StorageConfig {
                data_dir: env::var("DATA_DIR")
                    .unwrap_or_else(|_| ".".to_string())
                    .into(),
                chats_file: env::var("CHATS_FILE")
                    .unwrap_or_else(|_| "chats.json".to_string()),
                recent_chats_file: env::var("RECENT_CHATS_FILE")
                    .unwrap_or_else(|_| "recentChats.json".to_string()),
                users_file: env::var("USERS_FILE")
                    .unwrap_or_else(|_| "users.json".to_string()),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                api_port: env::var("API_PORT")
                    .or_else(|_| env::var("PORT"))
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
                static_dir: env::var("STATIC_DIR")
                    .unwrap_or_else(|_| "static".to_string())
                    .into(),
                templates_dir: env::var("TEMPLATES_DIR")
                    .unwrap_or_else(|_| "templates".to_string())
                    .into(),
                cors_origins: env::var("CORS_ORIGINS").ok(),
            },
        }
    }

    /// Configuration rooted at `data_dir`, with every other setting at its default.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Config {
            storage: StorageConfig {
                data_dir: data_dir.into(),
                chats_file: "chats.json".to_string(),
                recent_chats_file: "recentChats.json".to_string(),
                users_file: "users.json".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                api_port: 8080,
                static_dir: "static".into(),
                templates_dir: "templates".into(),
                cors_origins: None,
            },
        }
    }
}
