//! Content source traits.
//!
//! A content source is a hierarchical store of folders and files (a shared
//! drive, a data room export, a bucket). The pipeline only needs to list a
//! folder's children and fetch one item, so authentication and vendor quirks
//! stay inside the implementation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use portfolio_sync::traits::source::ContentSource;
//!
//! // Children of a company folder
//! let entries = source.list_children("folder-id").await?;
//!
//! // Export a native document as text
//! let text = source.fetch_text("doc-id", ExportFormat::PlainText).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::SourceResult;
use crate::types::{
    config::SheetRef,
    item::{ExportFormat, SourceEntry},
};

/// Hierarchical content source.
///
/// Implementations:
/// - `GoogleDriveSource` - Drive v3 REST API (requires `google-drive` feature)
/// - `RateLimitedSource` - wraps any source with a request quota
/// - `MockSource` - in-memory tree for tests
///
/// Any call may fail transiently or permanently; callers catch failures per
/// item and keep going.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// List the direct children of a folder (files and folders).
    async fn list_children(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>>;

    /// Export a native document in the given text format.
    async fn fetch_text(&self, item_id: &str, format: ExportFormat) -> SourceResult<String>;

    /// Download an item's raw bytes.
    async fn fetch_bytes(&self, item_id: &str) -> SourceResult<Vec<u8>>;

    /// List only the subfolders of a folder.
    async fn list_folders(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>> {
        let children = self.list_children(folder_id).await?;
        Ok(children.into_iter().filter(|e| e.kind.is_folder()).collect())
    }

    /// Get the source name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

#[async_trait]
impl<T: ContentSource + ?Sized> ContentSource for Arc<T> {
    async fn list_children(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>> {
        (**self).list_children(folder_id).await
    }

    async fn fetch_text(&self, item_id: &str, format: ExportFormat) -> SourceResult<String> {
        (**self).fetch_text(item_id, format).await
    }

    async fn fetch_bytes(&self, item_id: &str) -> SourceResult<Vec<u8>> {
        (**self).fetch_bytes(item_id).await
    }

    async fn list_folders(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>> {
        (**self).list_folders(folder_id).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Cell values of one sheet tab, header row first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetValues {
    /// Title of the tab that was read
    pub title: String,

    pub rows: Vec<Vec<String>>,
}

impl SheetValues {
    pub fn new(title: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            title: title.into(),
            rows,
        }
    }

    /// Header row, trimmed. Empty when the sheet is empty.
    pub fn headers(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.iter().map(|h| h.trim().to_string()).collect())
            .unwrap_or_default()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Source of tabular values (the holdings spreadsheet).
#[async_trait]
pub trait SheetSource: Send + Sync {
    /// Read the configured range of one tab.
    async fn read_sheet(&self, sheet: &SheetRef) -> SourceResult<SheetValues>;
}

#[async_trait]
impl<T: SheetSource + ?Sized> SheetSource for Arc<T> {
    async fn read_sheet(&self, sheet: &SheetRef) -> SourceResult<SheetValues> {
        (**self).read_sheet(sheet).await
    }
}
