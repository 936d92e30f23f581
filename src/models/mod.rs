// src/models/mod.rs

//! Domain models for the sync application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod post;
mod reddit;

// Re-export all public types
pub use config::{CommentsConfig, Config, GoogleConfig, RedditConfig, StorageConfig};
pub use post::{COLUMNS, DATE_FORMAT, PostRecord, format_date, parse_date};
pub use reddit::{Comment, CommentForest, FeedPost, MoreComments};
