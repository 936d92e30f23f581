//! Service layer for the sync application.
//!
//! This module contains the business logic for:
//! - Reddit API access (`RedditClient`)
//! - Newest-first feed paging with watermark and cap (`FeedReader`)
//! - Top comment selection (`CommentSelector`)
//! - Google authorization (`GoogleSession`)

pub mod auth;
mod comments;
mod feed;
mod reddit;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Comment, CommentForest, FeedPost, MoreComments};

pub use auth::GoogleSession;
pub use comments::{CommentSelector, select_top_comment};
pub use feed::{FeedQuery, FeedReader, StopReason};
pub use reddit::RedditClient;

#[cfg(test)]
pub(crate) use feed::tests::{FakeSource, hourly_posts, post_at};

/// One page of a subreddit's `new` listing.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    /// Posts, newest first
    pub posts: Vec<FeedPost>,
    /// Cursor for the next page, `None` once the listing is exhausted
    pub after: Option<String>,
}

/// Read-only source of subreddit posts and their comments.
#[async_trait]
pub trait PostSource: Send + Sync {
    /// Fetch one page of newest posts, continuing after the given cursor.
    async fn fetch_new(&self, subreddit: &str, after: Option<&str>) -> Result<FeedPage>;

    /// Fetch the top-level comments of a post.
    async fn fetch_comments(&self, post: &FeedPost) -> Result<CommentForest>;

    /// Materialize the top-level comments hidden behind a placeholder.
    async fn expand_more(&self, post: &FeedPost, more: &MoreComments) -> Result<Vec<Comment>>;
}
