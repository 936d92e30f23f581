//! Application configuration structures.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Reddit API credentials and request behavior
    #[serde(default)]
    pub reddit: RedditConfig,

    /// Comment selection settings
    #[serde(default)]
    pub comments: CommentsConfig,

    /// Local CSV storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Google Drive / Sheets storage settings
    #[serde(default)]
    pub google: GoogleConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply credential overrides from the environment.
    pub fn with_env_overrides(mut self) -> Self {
        let overrides = [
            ("REDDIT_CLIENT_ID", &mut self.reddit.client_id),
            ("REDDIT_CLIENT_SECRET", &mut self.reddit.client_secret),
            ("GOOGLE_CLIENT_ID", &mut self.google.client_id),
            ("GOOGLE_CLIENT_SECRET", &mut self.google.client_secret),
        ];
        for (key, field) in overrides {
            if let Ok(value) = env::var(key) {
                if !value.trim().is_empty() {
                    *field = value;
                }
            }
        }
        self
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.reddit.user_agent.trim().is_empty() {
            return Err(AppError::validation("reddit.user_agent is empty"));
        }
        if self.reddit.timeout_secs == 0 {
            return Err(AppError::validation("reddit.timeout_secs must be > 0"));
        }
        if self.reddit.page_size == 0 || self.reddit.page_size > 100 {
            return Err(AppError::validation(
                "reddit.page_size must be between 1 and 100",
            ));
        }
        if self.google.timeout_secs == 0 {
            return Err(AppError::validation("google.timeout_secs must be > 0"));
        }
        if self.google.root_folder.trim().is_empty() {
            return Err(AppError::validation("google.root_folder is empty"));
        }
        if self.google.category_folder.trim().is_empty() {
            return Err(AppError::validation("google.category_folder is empty"));
        }
        Ok(())
    }
}

/// Reddit API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    /// User-Agent header for API requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Script application client id
    #[serde(default)]
    pub client_id: String,

    /// Script application client secret
    #[serde(default)]
    pub client_secret: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Posts requested per listing page (API maximum is 100)
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Delay between comment requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl RedditConfig {
    /// Fail early when credentials are missing.
    pub fn require_credentials(&self) -> Result<()> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(AppError::config(
                "Reddit credentials missing: set reddit.client_id/client_secret or REDDIT_CLIENT_ID/REDDIT_CLIENT_SECRET",
            ));
        }
        Ok(())
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: defaults::timeout(),
            page_size: defaults::page_size(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

/// Comment selection settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CommentsConfig {
    /// Resolve "more" placeholders instead of discarding them
    #[serde(default)]
    pub expand_more: bool,
}

/// Local CSV storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<subreddit>.csv` per subreddit
    #[serde(default = "defaults::output_dir")]
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: defaults::output_dir(),
        }
    }
}

/// Google Drive / Sheets settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client id of an installed ("desktop") application
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered for the client
    #[serde(default = "defaults::redirect_uri")]
    pub redirect_uri: String,

    /// Timeout in seconds for Drive, Sheets and token requests
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Top-level Drive folder
    #[serde(default = "defaults::root_folder")]
    pub root_folder: String,

    /// Folder inside `root_folder` holding one spreadsheet per subreddit
    #[serde(default = "defaults::category_folder")]
    pub category_folder: String,

    /// Where to cache the authorized token between runs
    #[serde(default)]
    pub token_cache: Option<PathBuf>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: defaults::redirect_uri(),
            timeout_secs: defaults::timeout(),
            root_folder: defaults::root_folder(),
            category_folder: defaults::category_folder(),
            token_cache: None,
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Reddit defaults
    pub fn user_agent() -> String {
        concat!("reddit-sync/", env!("CARGO_PKG_VERSION")).into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn request_delay() -> u64 {
        0
    }

    // Storage defaults
    pub fn output_dir() -> PathBuf {
        PathBuf::from(".")
    }

    // Google defaults
    pub fn redirect_uri() -> String {
        "http://localhost:8080/".into()
    }
    pub fn root_folder() -> String {
        "Automation".into()
    }
    pub fn category_folder() -> String {
        "Reddit".into()
    }
}
