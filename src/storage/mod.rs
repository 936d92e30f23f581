//! Storage abstractions for synced posts.
//!
//! Every backend keeps one target per subreddit and answers two questions:
//! what is the newest post already stored (the watermark), and how to append
//! a batch of new records after it.
//!
//! ```text
//! CsvStorage                      SheetStorage
//! {output_dir}/                   My Drive/
//! ├── rust.csv                    └── {root_folder}/
//! └── AskReddit.csv                   └── {category_folder}/
//!                                         ├── rust        (spreadsheet)
//!                                         └── AskReddit   (spreadsheet)
//! ```

pub mod drive;
pub mod local;
pub mod sheets;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{PostRecord, parse_date};

// Re-export for convenience
pub use drive::{DriveApi, GoogleDrive};
pub use local::CsvStorage;
pub use sheets::SheetStorage;

/// Metadata about a storage write operation.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of records appended
    pub written: usize,
    /// Human readable location of the target
    pub location: String,
    /// Timestamp of the write
    pub timestamp: DateTime<Utc>,
}

/// Trait for per-subreddit post storage backends.
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Creation time of the last stored post, or `None` for a full resync.
    async fn get_last_post_date(&self, subreddit: &str) -> Result<Option<DateTime<Utc>>>;

    /// Append records, oldest first, creating the target if needed.
    async fn write_posts(&self, subreddit: &str, records: &[PostRecord]) -> Result<WriteMetadata>;
}

/// Turn a stored `date` value into a watermark, logging values that do not parse.
pub(crate) fn watermark_from(value: &str, location: &str) -> Option<DateTime<Utc>> {
    let parsed = parse_date(value);
    if parsed.is_none() {
        log::warn!(
            "Last date '{}' in {} is not a valid timestamp, syncing from scratch",
            value,
            location
        );
    }
    parsed
}

/// Position of the `date` column given a header row, defaulting to the first column.
pub(crate) fn date_column<'a>(header: impl IntoIterator<Item = &'a str>) -> usize {
    header
        .into_iter()
        .position(|name| name.trim() == "date")
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_column() {
        assert_eq!(date_column(["date", "title"]), 0);
        assert_eq!(date_column(["title", " date "]), 1);
        assert_eq!(date_column(["a", "b"]), 0);
    }

    #[test]
    fn test_watermark_from() {
        assert!(watermark_from("2024-01-01 00:00:00 UTC", "x").is_some());
        assert!(watermark_from("garbage", "x").is_none());
    }
}
