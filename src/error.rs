// src/error.rs

//! Unified error handling for the sync application.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV reading or writing failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authorization flow failed
    #[error("Authorization error: {0}")]
    Auth(String),

    /// Reddit API returned an unusable response
    #[error("Reddit error for {context}: {message}")]
    Reddit { context: String, message: String },

    /// Google Drive / Sheets API returned an unusable response
    #[error("Drive error for {context}: {message}")]
    Drive { context: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authorization error.
    pub fn auth(message: impl fmt::Display) -> Self {
        Self::Auth(message.to_string())
    }

    /// Create a Reddit API error with context.
    pub fn reddit(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Reddit {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a Drive API error with context.
    pub fn drive(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Drive {
            context: context.into(),
            message: message.to_string(),
        }
    }
}
