// src/services/feed.rs

//! Newest-first feed reader.
//!
//! Pages through a subreddit lazily and yields posts that meet the score
//! threshold. Iteration ends at the first post created at or before the
//! watermark, once the cap is reached, or when the listing runs out.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::FeedPost;
use crate::services::PostSource;

/// Why the reader stopped producing posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The requested number of posts was produced
    Cap,
    /// A post at or before the watermark was reached
    Watermark,
    /// The listing has no more pages
    Exhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::Cap => "post cap reached",
            StopReason::Watermark => "reached previously synced posts",
            StopReason::Exhausted => "feed exhausted",
        };
        f.write_str(text)
    }
}

/// Parameters of a feed read.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    /// Minimum score a post needs to be yielded
    pub min_score: i64,
    /// Maximum number of posts to yield
    pub max_posts: usize,
    /// Creation time of the newest already-stored post
    pub watermark: Option<DateTime<Utc>>,
}

/// Lazy reader over a subreddit's newest posts.
pub struct FeedReader<'a> {
    source: &'a dyn PostSource,
    subreddit: String,
    query: FeedQuery,
    buffer: VecDeque<FeedPost>,
    after: Option<String>,
    pages_fetched: usize,
    yielded: usize,
    skipped: usize,
    stop: Option<StopReason>,
}

impl<'a> FeedReader<'a> {
    pub fn new(source: &'a dyn PostSource, subreddit: impl Into<String>, query: FeedQuery) -> Self {
        Self {
            source,
            subreddit: subreddit.into(),
            query,
            buffer: VecDeque::new(),
            after: None,
            pages_fetched: 0,
            yielded: 0,
            skipped: 0,
            stop: None,
        }
    }

    /// Return the next qualifying post, or `None` once iteration has stopped.
    pub async fn next_post(&mut self) -> Result<Option<FeedPost>> {
        loop {
            if self.stop.is_some() {
                return Ok(None);
            }
            if self.yielded >= self.query.max_posts {
                return Ok(self.finish(StopReason::Cap));
            }

            let Some(post) = self.buffer.pop_front() else {
                if !self.fetch_page().await? {
                    return Ok(self.finish(StopReason::Exhausted));
                }
                continue;
            };

            if let Some(watermark) = self.query.watermark {
                if post.created_at() <= watermark {
                    log::debug!(
                        "Post {} at {} is not newer than watermark {}",
                        post.id,
                        post.created_at(),
                        watermark
                    );
                    return Ok(self.finish(StopReason::Watermark));
                }
            }

            if post.score < self.query.min_score {
                self.skipped += 1;
                continue;
            }

            self.yielded += 1;
            return Ok(Some(post));
        }
    }

    /// Pull the next page into the buffer. Returns false when nothing is left.
    async fn fetch_page(&mut self) -> Result<bool> {
        if self.pages_fetched > 0 && self.after.is_none() {
            return Ok(false);
        }

        let page = self
            .source
            .fetch_new(&self.subreddit, self.after.as_deref())
            .await?;
        self.pages_fetched += 1;
        self.after = page.after;

        if page.posts.is_empty() {
            return Ok(false);
        }
        self.buffer.extend(page.posts);
        Ok(true)
    }

    fn finish(&mut self, reason: StopReason) -> Option<FeedPost> {
        self.stop = Some(reason);
        None
    }

    /// Reason iteration ended, if it has.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop
    }

    /// Number of pages requested so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Number of posts dropped by the score filter.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}
