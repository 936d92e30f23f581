//! Google Drive and Sheets access.
//!
//! [`DriveApi`] is the small slice of the Drive v3 and Sheets v4 REST APIs
//! the sheet backend needs. [`GoogleDrive`] implements it over `reqwest`
//! using a caller-provided [`GoogleSession`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

use crate::error::{AppError, Result};
use crate::services::GoogleSession;
use crate::utils::http;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Parent id Drive uses for the top level of "My Drive".
pub const ROOT_PARENT: &str = "root";

const DRIVE_FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// File, folder and spreadsheet operations used by the sheet backend.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Id of a non-trashed file with this exact name, type and parent.
    async fn find_file(&self, name: &str, mime_type: &str, parent: &str) -> Result<Option<String>>;

    /// Create a file (folder or spreadsheet) and return its id.
    async fn create_file(&self, name: &str, mime_type: &str, parent: &str) -> Result<String>;

    /// All rows of the spreadsheet's first worksheet, as displayed text.
    async fn read_rows(&self, spreadsheet_id: &str) -> Result<Vec<Vec<String>>>;

    /// Append rows after the last row of the first worksheet.
    async fn append_rows(&self, spreadsheet_id: &str, rows: &[Vec<Value>]) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Escape a value for use inside a quoted Drive query string.
fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// A1 range covering a whole worksheet.
fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// REST client for Drive and Sheets.
pub struct GoogleDrive {
    client: Client,
    session: GoogleSession,
}

impl GoogleDrive {
    pub fn new(client: Client, session: GoogleSession) -> Self {
        Self { client, session }
    }

    fn sheets_url(spreadsheet_id: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(SHEETS_URL)?;
        url.path_segments_mut()
            .map_err(|_| AppError::drive(SHEETS_URL, "cannot be a base URL"))?
            .push(spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(self.session.access_token())
            .send()
            .await?;
        let response =
            http::error_for_status(response, context, |c, m| AppError::drive(c, m)).await?;
        Ok(response.json().await?)
    }

    /// Title of the first worksheet, which holds the records.
    async fn first_sheet_title(&self, spreadsheet_id: &str) -> Result<String> {
        let url = Self::sheets_url(spreadsheet_id, &[])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "sheets.properties.title")]);
        let spreadsheet: Spreadsheet = self.send_json(request, "spreadsheets.get").await?;

        spreadsheet
            .sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| AppError::drive(spreadsheet_id, "spreadsheet has no worksheets"))
    }
}

#[async_trait]
impl DriveApi for GoogleDrive {
    async fn find_file(&self, name: &str, mime_type: &str, parent: &str) -> Result<Option<String>> {
        let query = format!(
            "name = '{}' and mimeType = '{}' and '{}' in parents and trashed = false",
            escape_query(name),
            mime_type,
            escape_query(parent)
        );
        let request = self.client.get(DRIVE_FILES_URL).query(&[
            ("q", query.as_str()),
            ("fields", "files(id)"),
            ("spaces", "drive"),
            ("pageSize", "10"),
        ]);
        let list: FileList = self.send_json(request, "files.list").await?;

        if list.files.len() > 1 {
            log::warn!(
                "Found {} files named '{}' in {}, using the first",
                list.files.len(),
                name,
                parent
            );
        }
        Ok(list.files.into_iter().next().map(|f| f.id))
    }

    async fn create_file(&self, name: &str, mime_type: &str, parent: &str) -> Result<String> {
        let request = self
            .client
            .post(DRIVE_FILES_URL)
            .query(&[("fields", "id")])
            .json(&json!({
                "name": name,
                "mimeType": mime_type,
                "parents": [parent],
            }));
        let file: DriveFile = self.send_json(request, "files.create").await?;
        log::debug!("Created {} '{}' ({})", mime_type, name, file.id);
        Ok(file.id)
    }

    async fn read_rows(&self, spreadsheet_id: &str) -> Result<Vec<Vec<String>>> {
        let title = self.first_sheet_title(spreadsheet_id).await?;
        let url = Self::sheets_url(spreadsheet_id, &["values", &sheet_range(&title)])?;
        let request = self.client.get(url).query(&[
            ("majorDimension", "ROWS"),
            ("valueRenderOption", "FORMATTED_VALUE"),
        ]);
        let range: ValueRange = self.send_json(request, "values.get").await?;
        Ok(range.values)
    }

    async fn append_rows(&self, spreadsheet_id: &str, rows: &[Vec<Value>]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let title = self.first_sheet_title(spreadsheet_id).await?;
        let append = format!("{}:append", sheet_range(&title));
        let url = Self::sheets_url(spreadsheet_id, &["values", &append])?;
        let request = self
            .client
            .post(url)
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "majorDimension": "ROWS", "values": rows }));
        let _: Value = self.send_json(request, "values.append").await?;
        Ok(())
    }
}
