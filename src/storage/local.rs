//! Local CSV file storage implementation.
//!
//! One `{subreddit}.csv` per subreddit under the output directory, appended
//! to on every run.
//!
//! ## File Layout
//!
//! ```text
//! date,title,post_content,post_vote_count,top_comment,comment_vote_count
//! 2024-01-01 09:30:00 UTC,First,,12,Nice,3
//! 2024-01-01 10:05:12 UTC,"Second, with comma",body,40,,0
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fs4::fs_std::FileExt;

use crate::error::{AppError, Result};
use crate::models::{COLUMNS, PostRecord};
use crate::storage::{WatermarkStore, WriteMetadata, date_column, watermark_from};

/// CSV file storage backend.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    root_dir: PathBuf,
}

impl CsvStorage {
    /// Create a new CsvStorage writing into the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Path of the file holding a subreddit's posts.
    pub fn path_for(&self, subreddit: &str) -> PathBuf {
        self.root_dir.join(format!("{subreddit}.csv"))
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// `date` value of the last data row, if the file has any.
    async fn read_last_date(path: &Path) -> Result<Option<String>> {
        let Some(bytes) = Self::read_bytes(path).await? else {
            return Ok(None);
        };

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let column = date_column(reader.headers()?.iter());

        let mut last = None;
        for record in reader.records() {
            let record = record?;
            if let Some(value) = record.get(column) {
                last = Some(value.to_string());
            }
        }
        Ok(last)
    }

    /// Serialize rows, prefixed with the header when requested.
    fn encode(records: &[PostRecord], with_header: bool) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if with_header {
            writer.write_record(COLUMNS)?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer
            .into_inner()
            .map_err(|e| AppError::Io(e.into_error()))
    }
}

/// Append `rows` while holding an exclusive lock on the file.
///
/// The header is prepended only when the file is empty at the time the lock
/// is held, so concurrent writers never both see an empty file.
fn append_locked(path: &Path, header: &[u8], rows: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;

    let mut bytes = Vec::with_capacity(header.len() + rows.len());
    if file.metadata()?.len() == 0 {
        bytes.extend_from_slice(header);
    }
    bytes.extend_from_slice(rows);
    file.write_all(&bytes)?;
    file.flush()
    // lock released when the file is closed
}

#[async_trait]
impl WatermarkStore for CsvStorage {
    async fn get_last_post_date(&self, subreddit: &str) -> Result<Option<DateTime<Utc>>> {
        let path = self.path_for(subreddit);
        let location = path.display().to_string();

        match Self::read_last_date(&path).await {
            Ok(Some(value)) => Ok(watermark_from(&value, &location)),
            Ok(None) => {
                log::info!("No stored posts in {}", location);
                Ok(None)
            }
            Err(e) => {
                log::info!("Could not read {}: {}. Syncing from scratch.", location, e);
                Ok(None)
            }
        }
    }

    async fn write_posts(&self, subreddit: &str, records: &[PostRecord]) -> Result<WriteMetadata> {
        let path = self.path_for(subreddit);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let header = Self::encode(&[], true)?;
        let rows = Self::encode(records, false)?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || append_locked(&target, &header, &rows))
            .await
            .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

        log::info!("Appended {} rows to {}", records.len(), path.display());
        Ok(WriteMetadata {
            written: records.len(),
            location: path.display().to_string(),
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_date;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn record(title: &str, day: u32) -> PostRecord {
        PostRecord {
            date: format_date(Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).unwrap()),
            title: title.to_string(),
            post_content: "line one\nline two".to_string(),
            post_vote_count: 10,
            top_comment: "says \"hi\", twice".to_string(),
            comment_vote_count: 2,
        }
    }

    async fn read(storage: &CsvStorage, subreddit: &str) -> String {
        tokio::fs::read_to_string(storage.path_for(subreddit))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_missing_file_has_no_watermark() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());

        assert!(storage.get_last_post_date("rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_header_only_file_has_no_watermark() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());
        storage.write_posts("rust", &[]).await.unwrap();

        assert_eq!(read(&storage, "rust").await.lines().count(), 1);
        assert!(storage.get_last_post_date("rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_read_watermark() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());
        let records = vec![record("first", 1), record("second", 2)];

        let meta = storage.write_posts("rust", &records).await.unwrap();
        assert_eq!(meta.written, 2);

        let watermark = storage.get_last_post_date("rust").await.unwrap().unwrap();
        assert_eq!(format_date(watermark), records[1].date);
    }

    #[tokio::test]
    async fn test_header_written_once() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());

        storage.write_posts("rust", &[record("a", 1)]).await.unwrap();
        storage.write_posts("rust", &[record("b", 2)]).await.unwrap();

        let content = read(&storage, "rust").await;
        let header = COLUMNS.join(",");
        assert_eq!(content.matches(&header).count(), 1);
        assert!(content.starts_with(&header));

        let mut reader = csv::Reader::from_reader(content.as_bytes());
        let rows: Vec<PostRecord> = reader.deserialize().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "a");
        assert_eq!(rows[1].top_comment, "says \"hi\", twice");
        assert_eq!(rows[1].post_content, "line one\nline two");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_writes_share_one_header() {
        let header = COLUMNS.join(",");
        for _ in 0..50 {
            let tmp = TempDir::new().unwrap();
            let storage = CsvStorage::new(tmp.path());

            let writers: Vec<_> = (1..=4)
                .map(|day| {
                    let storage = storage.clone();
                    tokio::spawn(async move {
                        storage.write_posts("rust", &[record("p", day)]).await
                    })
                })
                .collect();
            for writer in writers {
                writer.await.unwrap().unwrap();
            }

            let content = read(&storage, "rust").await;
            assert!(content.starts_with(&header));
            assert_eq!(content.lines().filter(|line| *line == header).count(), 1);

            let mut reader = csv::Reader::from_reader(content.as_bytes());
            assert_eq!(reader.records().count(), 4);
        }
    }

    #[tokio::test]
    async fn test_empty_existing_file_gets_header() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());
        tokio::fs::write(storage.path_for("rust"), b"").await.unwrap();

        storage.write_posts("rust", &[record("a", 1)]).await.unwrap();
        assert!(read(&storage, "rust").await.starts_with("date,title"));
    }

    #[tokio::test]
    async fn test_unparseable_date_degrades() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());
        tokio::fs::write(
            storage.path_for("rust"),
            "date,title,post_content,post_vote_count,top_comment,comment_vote_count\nsoon,x,,1,,0\n",
        )
        .await
        .unwrap();

        assert!(storage.get_last_post_date("rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_file_degrades() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path());
        // a directory where the file should be
        tokio::fs::create_dir(storage.path_for("rust")).await.unwrap();

        assert!(storage.get_last_post_date("rust").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_creates_output_dir() {
        let tmp = TempDir::new().unwrap();
        let storage = CsvStorage::new(tmp.path().join("nested/out"));

        storage.write_posts("rust", &[record("a", 1)]).await.unwrap();
        assert!(storage.path_for("rust").exists());
    }
}
