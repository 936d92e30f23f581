//! Google Sheets storage implementation.
//!
//! Keeps one spreadsheet per subreddit inside a two-level Drive folder
//! hierarchy. Folders and spreadsheets are looked up by name and parent on
//! every run and created when missing. Two processes syncing at the same
//! time can both miss a lookup and create duplicates; runs are assumed to be
//! single-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;
use crate::models::{COLUMNS, GoogleConfig, PostRecord};
use crate::storage::drive::{FOLDER_MIME, ROOT_PARENT, SPREADSHEET_MIME};
use crate::storage::{DriveApi, WatermarkStore, WriteMetadata, date_column, watermark_from};

/// Spreadsheet storage backend.
pub struct SheetStorage<D> {
    drive: D,
    root_folder: String,
    category_folder: String,
}

impl<D: DriveApi> SheetStorage<D> {
    pub fn new(drive: D, config: &GoogleConfig) -> Self {
        Self {
            drive,
            root_folder: config.root_folder.clone(),
            category_folder: config.category_folder.clone(),
        }
    }

    pub fn drive(&self) -> &D {
        &self.drive
    }

    fn location(&self, subreddit: &str) -> String {
        format!(
            "sheet {}/{}/{}",
            self.root_folder, self.category_folder, subreddit
        )
    }

    /// Look a folder up by name and parent, creating it if absent.
    async fn ensure_folder(&self, name: &str, parent: &str) -> Result<String> {
        if let Some(id) = self.drive.find_file(name, FOLDER_MIME, parent).await? {
            return Ok(id);
        }
        log::info!("Creating Drive folder '{}'", name);
        self.drive.create_file(name, FOLDER_MIME, parent).await
    }

    /// Id of the category folder that holds the spreadsheets.
    async fn resolve_folder(&self) -> Result<String> {
        let root = self.ensure_folder(&self.root_folder, ROOT_PARENT).await?;
        self.ensure_folder(&self.category_folder, &root).await
    }

    /// Find the subreddit's spreadsheet or create it with a header row.
    ///
    /// The flag is true when the spreadsheet was created by this call.
    async fn resolve_sheet(&self, folder: &str, subreddit: &str) -> Result<(String, bool)> {
        if let Some(id) = self
            .drive
            .find_file(subreddit, SPREADSHEET_MIME, folder)
            .await?
        {
            return Ok((id, false));
        }

        log::info!("Creating spreadsheet '{}'", subreddit);
        let id = self
            .drive
            .create_file(subreddit, SPREADSHEET_MIME, folder)
            .await?;
        self.drive.append_rows(&id, &[header_cells()]).await?;
        Ok((id, true))
    }
}

fn header_cells() -> Vec<Value> {
    COLUMNS.iter().map(|c| Value::from(*c)).collect()
}

/// Sheet cells for a record. Scores stay numeric so the sheet can sort on them.
fn record_cells(record: &PostRecord) -> Vec<Value> {
    vec![
        Value::from(record.date.as_str()),
        Value::from(record.title.as_str()),
        Value::from(record.post_content.as_str()),
        Value::from(record.post_vote_count),
        Value::from(record.top_comment.as_str()),
        Value::from(record.comment_vote_count),
    ]
}

/// `date` of the last non-empty data row.
fn last_date(rows: &[Vec<String>]) -> Option<&str> {
    let (header, data) = rows.split_first()?;
    let column = date_column(header.iter().map(String::as_str));
    data.iter()
        .rev()
        .filter_map(|row| row.get(column))
        .map(|value| value.as_str())
        .find(|value| !value.trim().is_empty())
}

#[async_trait]
impl<D: DriveApi> WatermarkStore for SheetStorage<D> {
    async fn get_last_post_date(&self, subreddit: &str) -> Result<Option<DateTime<Utc>>> {
        let folder = match self.resolve_folder().await {
            Ok(id) => id,
            Err(e) => {
                log::warn!(
                    "Could not resolve Drive folder {}/{}: {}. Syncing from scratch.",
                    self.root_folder,
                    self.category_folder,
                    e
                );
                return Ok(None);
            }
        };

        let (sheet, created) = self.resolve_sheet(&folder, subreddit).await?;
        if created {
            return Ok(None);
        }

        let rows = self.drive.read_rows(&sheet).await?;
        let location = self.location(subreddit);
        match last_date(&rows) {
            Some(value) => Ok(watermark_from(value, &location)),
            None => {
                log::info!("No stored posts in {}", location);
                Ok(None)
            }
        }
    }

    async fn write_posts(&self, subreddit: &str, records: &[PostRecord]) -> Result<WriteMetadata> {
        let folder = self.resolve_folder().await?;
        let (sheet, created) = self.resolve_sheet(&folder, subreddit).await?;
        let location = self.location(subreddit);

        // An existing sheet can be empty if its header append failed earlier
        let mut rows = Vec::with_capacity(records.len() + 1);
        if !created && self.drive.read_rows(&sheet).await?.is_empty() {
            log::info!("{} has no header, adding it", location);
            rows.push(header_cells());
        }
        rows.extend(records.iter().map(record_cells));
        self.drive.append_rows(&sheet, &rows).await?;

        log::info!("Appended {} rows to {}", records.len(), location);
        Ok(WriteMetadata {
            written: records.len(),
            location,
            timestamp: Utc::now(),
        })
    }
}
