// src/pipeline/sync.rs

//! Incremental subreddit sync.
//!
//! Resolves the watermark from storage, reads the feed until the cap or the
//! watermark is hit, then appends the batch oldest-first in a single write.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{PostRecord, format_date};
use crate::services::{CommentSelector, FeedQuery, FeedReader, PostSource, StopReason};
use crate::storage::WatermarkStore;

/// Parameters of one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub subreddit: String,
    pub min_upvotes: i64,
    pub max_posts: usize,
    /// Resolve "more" comment placeholders before picking the top comment
    pub expand_more: bool,
    /// Pause after each comment request
    pub request_delay: Duration,
}

impl SyncOptions {
    pub fn new(subreddit: impl Into<String>, min_upvotes: i64, max_posts: usize) -> Self {
        Self {
            subreddit: subreddit.into(),
            min_upvotes,
            max_posts,
            expand_more: false,
            request_delay: Duration::ZERO,
        }
    }
}

/// Summary of a sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub watermark: Option<DateTime<Utc>>,
    pub records_written: usize,
    pub stop_reason: StopReason,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Read qualifying posts newest-first and turn them into records.
pub async fn fetch_records(
    source: &dyn PostSource,
    options: &SyncOptions,
    watermark: Option<DateTime<Utc>>,
) -> Result<(Vec<PostRecord>, StopReason)> {
    let query = FeedQuery {
        min_score: options.min_upvotes,
        max_posts: options.max_posts,
        watermark,
    };
    let mut reader = FeedReader::new(source, options.subreddit.clone(), query);
    let selector =
        CommentSelector::new(source, options.expand_more).with_delay(options.request_delay);

    let mut records = Vec::new();
    while let Some(post) = reader.next_post().await? {
        let top_comment = selector.top_comment(&post).await?;
        records.push(PostRecord::new(&post, top_comment.as_ref()));
        log::info!(
            "Retrieved post {}/{}: {}",
            records.len(),
            options.max_posts,
            post.title
        );
    }

    // next_post only returns None after recording why it stopped
    let stop_reason = reader.stop_reason().unwrap_or(StopReason::Exhausted);
    log::info!(
        "Stopped after {} pages ({}), {} posts below {} upvotes skipped",
        reader.pages_fetched(),
        stop_reason,
        reader.skipped(),
        options.min_upvotes
    );
    Ok((records, stop_reason))
}

/// Run one incremental sync of a subreddit into the given store.
pub async fn run_sync(
    source: &dyn PostSource,
    store: &dyn WatermarkStore,
    options: &SyncOptions,
) -> Result<SyncReport> {
    let start_time = Utc::now();
    log::info!("Syncing r/{}", options.subreddit);

    let watermark = store.get_last_post_date(&options.subreddit).await?;
    match watermark {
        Some(date) => log::info!("Last synced post: {}", format_date(date)),
        None => log::info!("No previous posts found, fetching up to {}", options.max_posts),
    }

    let (mut records, stop_reason) = fetch_records(source, options, watermark).await?;

    // The feed is newest-first; storage is kept chronological
    records.reverse();

    let meta = store.write_posts(&options.subreddit, &records).await?;
    log::info!("Wrote {} new posts to {}", meta.written, meta.location);

    Ok(SyncReport {
        watermark,
        records_written: meta.written,
        stop_reason,
        location: meta.location,
        start_time,
        end_time: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{Comment, CommentForest, parse_date};
    use crate::services::{FakeSource, hourly_posts, post_at};
    use crate::storage::CsvStorage;

    async fn stored_titles(dir: &TempDir, subreddit: &str) -> Vec<String> {
        let path = CsvStorage::new(dir.path()).path_for(subreddit);
        let content = tokio::fs::read_to_string(path).await.unwrap();
        let mut reader = csv::Reader::from_reader(content.as_bytes());
        reader
            .deserialize::<PostRecord>()
            .map(|r| r.unwrap().title)
            .collect()
    }

    #[tokio::test]
    async fn test_threshold_scenario_writes_chronologically() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStorage::new(tmp.path());
        // p0 is newest: scores newest-first [15, 5, 20]
        let source = FakeSource::new(hourly_posts(&[15, 5, 20]), 10);

        let report = run_sync(&source, &store, &SyncOptions::new("test", 10, 10))
            .await
            .unwrap();

        assert_eq!(report.records_written, 2);
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert!(report.watermark.is_none());
        assert_eq!(stored_titles(&tmp, "test").await, vec!["Post p2", "Post p0"]);
    }

    #[tokio::test]
    async fn test_watermark_scenario() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStorage::new(tmp.path());
        let existing = PostRecord {
            date: "2024-01-01 00:00:00 UTC".to_string(),
            title: "Already here".to_string(),
            post_content: String::new(),
            post_vote_count: 1,
            top_comment: String::new(),
            comment_vote_count: 0,
        };
        store.write_posts("test", &[existing]).await.unwrap();

        let source = FakeSource::new(
            vec![
                post_at("new", 5, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()),
                post_at("equal", 5, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
                post_at("old", 5, Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap()),
            ],
            10,
        );

        let report = run_sync(&source, &store, &SyncOptions::new("test", 1, 10))
            .await
            .unwrap();

        assert_eq!(report.records_written, 1);
        assert_eq!(report.stop_reason, StopReason::Watermark);
        assert_eq!(report.watermark, parse_date("2024-01-01 00:00:00 UTC"));
        assert_eq!(
            stored_titles(&tmp, "test").await,
            vec!["Already here", "Post new"]
        );
    }

    #[tokio::test]
    async fn test_cap_keeps_most_recent() {
        let source = FakeSource::new(hourly_posts(&[3, 3, 3, 3, 3]), 2);
        let options = SyncOptions::new("test", 1, 2);

        let (records, stop) = fetch_records(&source, &options, None).await.unwrap();
        assert_eq!(stop, StopReason::Cap);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Post p0");
        assert_eq!(records[1].title, "Post p1");
    }

    #[tokio::test]
    async fn test_zero_comments_defaults() {
        let source = FakeSource::new(hourly_posts(&[7]), 10);
        let (records, _) = fetch_records(&source, &SyncOptions::new("test", 1, 10), None)
            .await
            .unwrap();

        assert_eq!(records[0].top_comment, "");
        assert_eq!(records[0].comment_vote_count, 0);
    }

    #[tokio::test]
    async fn test_top_comment_attached() {
        let mut posts = hourly_posts(&[7]);
        posts[0].num_comments = 2;
        let forest = CommentForest {
            comments: vec![
                Comment {
                    id: "c1".to_string(),
                    body: "meh".to_string(),
                    score: 1,
                    parent_id: "t3_p0".to_string(),
                },
                Comment {
                    id: "c2".to_string(),
                    body: "great".to_string(),
                    score: 30,
                    parent_id: "t3_p0".to_string(),
                },
            ],
            placeholders: Vec::new(),
        };
        let source = FakeSource::new(posts, 10).with_comments("p0", forest);

        let (records, _) = fetch_records(&source, &SyncOptions::new("test", 1, 10), None)
            .await
            .unwrap();
        assert_eq!(records[0].top_comment, "great");
        assert_eq!(records[0].comment_vote_count, 30);
    }

    #[tokio::test]
    async fn test_rerun_appends_only_newer_posts() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStorage::new(tmp.path());
        let posts = hourly_posts(&[1, 1, 1, 1]);

        // first run only sees the two oldest posts
        let first = FakeSource::new(posts[2..].to_vec(), 10);
        run_sync(&first, &store, &SyncOptions::new("test", 1, 10))
            .await
            .unwrap();

        let second = FakeSource::new(posts.clone(), 10);
        let report = run_sync(&second, &store, &SyncOptions::new("test", 1, 10))
            .await
            .unwrap();

        assert_eq!(report.records_written, 2);
        assert_eq!(
            stored_titles(&tmp, "test").await,
            vec!["Post p3", "Post p2", "Post p1", "Post p0"]
        );
    }

    #[tokio::test]
    async fn test_comment_failure_aborts_without_writing() {
        let tmp = TempDir::new().unwrap();
        let store = CsvStorage::new(tmp.path());
        let mut posts = hourly_posts(&[5, 5]);
        posts[1].num_comments = 1;
        let mut source = FakeSource::new(posts, 10);
        source.fail_comments = true;

        let result = run_sync(&source, &store, &SyncOptions::new("test", 1, 10)).await;
        assert!(result.is_err());
        assert!(!store.path_for("test").exists());
    }
}
