//! Feed-side data structures: posts, comments and "more" placeholders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A post as listed in a subreddit's `new` feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedPost {
    /// Base-36 post id (without the `t3_` prefix)
    pub id: String,

    /// Subreddit the post belongs to
    pub subreddit: String,

    pub title: String,

    /// Self-text body, empty for link posts
    #[serde(default)]
    pub selftext: String,

    pub score: i64,

    /// Creation time in seconds since the epoch
    pub created_utc: f64,

    #[serde(default)]
    pub num_comments: u64,
}

impl FeedPost {
    /// Fullname used by the API (`t3_<id>`).
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.id)
    }

    /// Creation time truncated to whole seconds.
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.created_utc.trunc() as i64, 0).unwrap_or_default()
    }
}

/// A single comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,

    #[serde(default)]
    pub body: String,

    pub score: i64,

    /// Fullname of the parent (a `t3_` post or a `t1_` comment)
    #[serde(default)]
    pub parent_id: String,
}

/// Stand-in for comments the listing did not include.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoreComments {
    #[serde(default)]
    pub parent_id: String,

    /// Ids of the comments hidden behind this placeholder
    #[serde(default)]
    pub children: Vec<String>,
}

/// Top-level comments of a post, before placeholders are resolved.
#[derive(Debug, Clone, Default)]
pub struct CommentForest {
    pub comments: Vec<Comment>,
    pub placeholders: Vec<MoreComments>,
}

impl CommentForest {
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty() && self.placeholders.is_empty()
    }
}
