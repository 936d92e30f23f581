//! Post record data structure.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Comment, FeedPost};

/// Column names in the order every storage backend writes them.
pub const COLUMNS: [&str; 6] = [
    "date",
    "title",
    "post_content",
    "post_vote_count",
    "top_comment",
    "comment_vote_count",
];

/// Format used for the `date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// One synced post, as persisted to storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    /// Creation time formatted with [`DATE_FORMAT`]
    pub date: String,

    /// Post title
    pub title: String,

    /// Self-text body (empty for link posts)
    pub post_content: String,

    /// Post score
    pub post_vote_count: i64,

    /// Body of the highest scoring top-level comment
    pub top_comment: String,

    /// Score of that comment (0 when there are none)
    pub comment_vote_count: i64,
}

impl PostRecord {
    /// Build a record from a feed post and its selected top comment.
    pub fn new(post: &FeedPost, top_comment: Option<&Comment>) -> Self {
        Self {
            date: format_date(post.created_at()),
            title: post.title.clone(),
            post_content: post.selftext.clone(),
            post_vote_count: post.score,
            top_comment: top_comment.map(|c| c.body.clone()).unwrap_or_default(),
            comment_vote_count: top_comment.map_or(0, |c| c.score),
        }
    }

    /// Row values in [`COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.title.clone(),
            self.post_content.clone(),
            self.post_vote_count.to_string(),
            self.top_comment.clone(),
            self.comment_vote_count.to_string(),
        ]
    }
}

/// Format a timestamp for the `date` column.
pub fn format_date(time: DateTime<Utc>) -> String {
    time.format(DATE_FORMAT).to_string()
}

/// Parse a stored `date` value back into a timestamp.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}
