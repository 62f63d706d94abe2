//! Configuration management for review-desk.
//!
//! Configuration can be set via environment variables:
//! - `HOST` - Optional. Server host. Defaults to `127.0.0.1`.
//! - `PORT` - Optional. Server port. Defaults to `3000`.
//! - `TASKS_MANIFEST` - Optional. Path to the task manifest JSON. Defaults to `web/tasks.json`.
//! - `PARTS_COUNT` - Optional. Number of reviewer parts. Defaults to `3`, must be at least 1.
//! - `DATA_DIR` - Optional. Directory for local storage. Defaults to `.review-desk`.
//! - `REVIEW_STORE` - Optional. Storage backend: `memory`, `file`, or `sqlite` (default).
//! - `GITHUB_TOKEN` - Optional. Enables uploads when set; requires the two variables below.
//! - `GITHUB_OWNER` - Repository owner for uploads.
//! - `GITHUB_REPO` - Repository name for uploads.
//! - `GITHUB_BRANCH` - Optional. Defaults to `main`.
//! - `GITHUB_STORAGE_PATH` - Optional. Directory inside the repository. Defaults to `questionnaire_data`.
//! - `GITHUB_API_BASE` - Optional. Defaults to `https://api.github.com`.

use crate::store::StoreType;
use crate::upload::UploadConfig;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Path to the task manifest JSON
    pub manifest_path: PathBuf,

    /// Number of reviewer parts the catalog is split into
    pub parts_count: usize,

    /// Directory for local storage
    pub data_dir: PathBuf,

    /// Storage backend selection
    pub store_type: StoreType,

    /// Upload target; `None` disables the upload endpoints
    pub upload: Option<UploadConfig>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for unparseable numbers or a
    /// zero parts count, and `ConfigError::MissingEnvVar` when
    /// `GITHUB_TOKEN` is set without its companion variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), format!("{}", e)))?;

        let manifest_path = std::env::var("TASKS_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("web/tasks.json"));

        let parts_count: usize = std::env::var("PARTS_COUNT")
            .unwrap_or_else(|_| "3".to_string())
            .parse()
            .map_err(|e| ConfigError::InvalidValue("PARTS_COUNT".to_string(), format!("{}", e)))?;
        if parts_count == 0 {
            return Err(ConfigError::InvalidValue(
                "PARTS_COUNT".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".review-desk"));

        let store_type = std::env::var("REVIEW_STORE")
            .map(|v| StoreType::from_str(&v))
            .unwrap_or_default();

        let upload = match std::env::var("GITHUB_TOKEN") {
            Ok(token) if !token.trim().is_empty() => Some(UploadConfig {
                token,
                owner: std::env::var("GITHUB_OWNER")
                    .map_err(|_| ConfigError::MissingEnvVar("GITHUB_OWNER".to_string()))?,
                repo: std::env::var("GITHUB_REPO")
                    .map_err(|_| ConfigError::MissingEnvVar("GITHUB_REPO".to_string()))?,
                branch: std::env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".to_string()),
                storage_path: std::env::var("GITHUB_STORAGE_PATH")
                    .unwrap_or_else(|_| "questionnaire_data".to_string()),
                api_base: std::env::var("GITHUB_API_BASE")
                    .unwrap_or_else(|_| "https://api.github.com".to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            manifest_path,
            parts_count,
            data_dir,
            store_type,
            upload,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(manifest_path: PathBuf, parts_count: usize, data_dir: PathBuf) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            manifest_path,
            parts_count,
            data_dir,
            store_type: StoreType::Memory,
            upload: None,
        }
    }
}
