//! Google Drive and Sheets source over the v3/v4 REST APIs.
//!
//! Requires the `google-drive` feature. Token minting is out of scope: the
//! source is handed a ready access token.
//!
//! # Example
//!
//! ```rust,ignore
//! use portfolio_sync::sources::{GoogleDriveSource, SourceExt};
//!
//! let drive = GoogleDriveSource::new(std::env::var("GOOGLE_ACCESS_TOKEN")?)?.rate_limited(10);
//! let syncer = Syncer::new(drive, MemoryStore::new(), summarizer, root_folder_id);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::{Result, SourceError, SourceResult};
use crate::security::SecretString;
use crate::traits::source::{ContentSource, SheetSource, SheetValues};
use crate::types::{
    config::SheetRef,
    item::{ExportFormat, MediaKind, SourceEntry},
};

const DRIVE_API_URL: &str = "https://www.googleapis.com/drive/v3";
const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4";
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, modifiedTime)";
const PAGE_SIZE: &str = "1000";

/// Drive folders and documents plus Sheets values, with one access token.
#[derive(Clone)]
pub struct GoogleDriveSource {
    client: Client,
    access_token: SecretString,
    drive_url: String,
    sheets_url: String,
}

// Request/Response types for the Drive and Sheets APIs

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    modified_time: Option<DateTime<Utc>>,
}

impl From<DriveFile> for SourceEntry {
    fn from(file: DriveFile) -> Self {
        SourceEntry {
            id: file.id,
            name: file.name,
            kind: MediaKind::from_mime(&file.mime_type),
            modified_at: file.modified_time,
        }
    }
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl GoogleDriveSource {
    /// Create a source authenticated with an OAuth access token.
    pub fn new(access_token: impl Into<SecretString>) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(SourceError::http)?;

        Ok(Self {
            client,
            access_token: access_token.into(),
            drive_url: DRIVE_API_URL.to_string(),
            sheets_url: SHEETS_API_URL.to_string(),
        })
    }

    /// Create from environment variable `GOOGLE_ACCESS_TOKEN`.
    ///
    /// A missing or blank token is a [`SyncError::Config`](crate::SyncError::Config).
    pub fn from_env() -> Result<Self> {
        Self::from_token(std::env::var("GOOGLE_ACCESS_TOKEN").ok())
    }

    fn from_token(token: Option<String>) -> Result<Self> {
        let token = SecretString::required("GOOGLE_ACCESS_TOKEN", token)?;
        Ok(Self::new(token)?)
    }

    /// Point the Drive calls at another base URL (proxies, tests).
    pub fn with_drive_url(mut self, url: impl Into<String>) -> Self {
        self.drive_url = url.into();
        self
    }

    /// Point the Sheets calls at another base URL.
    pub fn with_sheets_url(mut self, url: impl Into<String>) -> Self {
        self.sheets_url = url.into();
        self
    }

    async fn send(&self, id: &str, request: RequestBuilder) -> SourceResult<Response> {
        let response = request
            .header("Authorization", self.access_token.bearer())
            .send()
            .await
            .map_err(SourceError::http)?;

        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(SourceError::NotFound { id: id.to_string() }),
            StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimitExceeded),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(SourceError::Status {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Resolve the tab title for a gid, falling back to the first tab.
    async fn sheet_title(&self, sheet: &SheetRef) -> SourceResult<String> {
        let url = format!("{}/spreadsheets/{}", self.sheets_url, sheet.spreadsheet_id);
        let request = self
            .client
            .get(&url)
            .query(&[("fields", "sheets.properties(sheetId,title)")]);
        let meta: SpreadsheetMeta = self
            .send(&sheet.spreadsheet_id, request)
            .await?
            .json()
            .await
            .map_err(SourceError::http)?;

        let by_gid = sheet
            .gid
            .and_then(|gid| meta.sheets.iter().find(|s| s.properties.sheet_id == gid));
        by_gid
            .or_else(|| meta.sheets.first())
            .map(|s| s.properties.title.clone())
            .ok_or_else(|| SourceError::NotFound {
                id: sheet.spreadsheet_id.clone(),
            })
    }
}

#[async_trait]
impl ContentSource for GoogleDriveSource {
    async fn list_children(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>> {
        let query = format!("'{}' in parents and trashed = false", folder_id.replace('\'', "\\'"));
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(format!("{}/files", self.drive_url)).query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
                ("orderBy", "name"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = self
                .send(folder_id, request)
                .await?
                .json()
                .await
                .map_err(SourceError::http)?;
            entries.extend(page.files.into_iter().map(SourceEntry::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(folder_id, count = entries.len(), "Listed Drive folder");
        Ok(entries)
    }

    async fn fetch_text(&self, item_id: &str, format: ExportFormat) -> SourceResult<String> {
        let request = self
            .client
            .get(format!("{}/files/{}/export", self.drive_url, item_id))
            .query(&[("mimeType", format.mime())]);
        self.send(item_id, request)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::Decode {
                id: item_id.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_bytes(&self, item_id: &str) -> SourceResult<Vec<u8>> {
        let request = self
            .client
            .get(format!("{}/files/{}", self.drive_url, item_id))
            .query(&[("alt", "media"), ("supportsAllDrives", "true")]);
        let bytes = self
            .send(item_id, request)
            .await?
            .bytes()
            .await
            .map_err(SourceError::http)?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "google-drive"
    }
}

#[async_trait]
impl SheetSource for GoogleDriveSource {
    async fn read_sheet(&self, sheet: &SheetRef) -> SourceResult<SheetValues> {
        let title = self.sheet_title(sheet).await?;
        let range = format!("'{}'!{}", title.replace('\'', "''"), sheet.range);

        let mut url = url::Url::parse(&self.sheets_url).map_err(SourceError::http)?;
        url.path_segments_mut()
            .map_err(|_| SourceError::http("sheets base URL cannot have a path"))?
            .extend(["spreadsheets", sheet.spreadsheet_id.as_str(), "values", range.as_str()]);

        let values: ValueRange = self
            .send(&sheet.spreadsheet_id, self.client.get(url))
            .await?
            .json()
            .await
            .map_err(SourceError::http)?;

        let rows = values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        Ok(SheetValues::new(title, rows))
    }
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
