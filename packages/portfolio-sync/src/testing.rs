//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the sync library
//! without calling a real drive, spreadsheet or LLM.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{Result, SourceError, SourceResult, SyncError};
use crate::traits::{
    source::{ContentSource, SheetSource, SheetValues},
    summarizer::Summarizer,
};
use crate::types::{
    config::SheetRef,
    item::{ExportFormat, MediaKind, SourceEntry},
};

/// In-memory folder tree.
///
/// Folders and files are attached to a parent id. Listing and fetching can be
/// made to fail per id, and every call is recorded for assertions.
#[derive(Default)]
pub struct MockSource {
    children: Arc<RwLock<HashMap<String, Vec<SourceEntry>>>>,
    contents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing_lists: Arc<RwLock<HashSet<String>>>,
    failing_fetches: Arc<RwLock<HashSet<String>>>,
    delay: Option<Duration>,
    calls: Arc<RwLock<Vec<MockSourceCall>>>,
}

/// Record of a call made to the mock source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockSourceCall {
    List { folder_id: String },
    FetchText { item_id: String },
    FetchBytes { item_id: String },
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subfolder under `parent_id`.
    pub fn with_folder(self, parent_id: &str, folder_id: &str, name: &str) -> Self {
        self.add_entry(parent_id, SourceEntry::folder(folder_id, name));
        self.children
            .write()
            .unwrap()
            .entry(folder_id.to_string())
            .or_default();
        self
    }

    /// Add a plain-text file with content.
    pub fn with_text_file(self, parent_id: &str, file_id: &str, name: &str, text: &str) -> Self {
        let entry = SourceEntry::new(file_id, name, MediaKind::Text("text/plain".into()));
        self.with_file(parent_id, entry, text)
    }

    /// Add any entry with content.
    pub fn with_file(self, parent_id: &str, entry: SourceEntry, content: impl Into<Vec<u8>>) -> Self {
        self.contents
            .write()
            .unwrap()
            .insert(entry.id.clone(), content.into());
        self.add_entry(parent_id, entry);
        self
    }

    /// Add an entry with no content (fetching it fails with not found).
    pub fn with_entry(self, parent_id: &str, entry: SourceEntry) -> Self {
        self.add_entry(parent_id, entry);
        self
    }

    /// Make listing this folder fail.
    pub fn fail_list(self, folder_id: &str) -> Self {
        self.failing_lists
            .write()
            .unwrap()
            .insert(folder_id.to_string());
        self
    }

    /// Make fetching this item fail.
    pub fn fail_fetch(self, item_id: &str) -> Self {
        self.failing_fetches
            .write()
            .unwrap()
            .insert(item_id.to_string());
        self
    }

    /// Sleep before answering every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add an entry at runtime.
    pub fn add_entry(&self, parent_id: &str, entry: SourceEntry) {
        self.children
            .write()
            .unwrap()
            .entry(parent_id.to_string())
            .or_default()
            .push(entry);
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<MockSourceCall> {
        self.calls.read().unwrap().clone()
    }

    /// Ids of every item fetched, in call order.
    pub fn fetched_ids(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockSourceCall::FetchText { item_id } | MockSourceCall::FetchBytes { item_id } => {
                    Some(item_id)
                }
                MockSourceCall::List { .. } => None,
            })
            .collect()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    async fn record(&self, call: MockSourceCall) {
        self.calls.write().unwrap().push(call);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn content(&self, item_id: &str) -> SourceResult<Vec<u8>> {
        if self.failing_fetches.read().unwrap().contains(item_id) {
            return Err(SourceError::Status {
                status: 500,
                body: format!("injected failure for {}", item_id),
            });
        }
        self.contents
            .read()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                id: item_id.to_string(),
            })
    }
}

impl Clone for MockSource {
    fn clone(&self) -> Self {
        Self {
            children: Arc::clone(&self.children),
            contents: Arc::clone(&self.contents),
            failing_lists: Arc::clone(&self.failing_lists),
            failing_fetches: Arc::clone(&self.failing_fetches),
            delay: self.delay,
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl ContentSource for MockSource {
    async fn list_children(&self, folder_id: &str) -> SourceResult<Vec<SourceEntry>> {
        self.record(MockSourceCall::List {
            folder_id: folder_id.to_string(),
        })
        .await;

        if self.failing_lists.read().unwrap().contains(folder_id) {
            return Err(SourceError::Status {
                status: 503,
                body: format!("injected listing failure for {}", folder_id),
            });
        }
        self.children
            .read()
            .unwrap()
            .get(folder_id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound {
                id: folder_id.to_string(),
            })
    }

    async fn fetch_text(&self, item_id: &str, _format: ExportFormat) -> SourceResult<String> {
        self.record(MockSourceCall::FetchText {
            item_id: item_id.to_string(),
        })
        .await;
        let bytes = self.content(item_id)?;
        String::from_utf8(bytes).map_err(|e| SourceError::Decode {
            id: item_id.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_bytes(&self, item_id: &str) -> SourceResult<Vec<u8>> {
        self.record(MockSourceCall::FetchBytes {
            item_id: item_id.to_string(),
        })
        .await;
        self.content(item_id)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Summarizer with a canned answer.
#[derive(Clone)]
pub struct MockSummarizer {
    response: Arc<RwLock<std::result::Result<String, String>>>,
    prompts: Arc<RwLock<Vec<String>>>,
}

impl Default for MockSummarizer {
    fn default() -> Self {
        Self::new("{}")
    }
}

impl MockSummarizer {
    /// Always answer with `response`.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: Arc::new(RwLock::new(Ok(response.into()))),
            prompts: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let mock = Self::new("");
        *mock.response.write().unwrap() = Err(message.into());
        mock
    }

    /// Answer with a serialized JSON value.
    pub fn with_json(value: serde_json::Value) -> Self {
        Self::new(value.to_string())
    }

    /// Replace the canned answer.
    pub fn set_response(&self, response: impl Into<String>) {
        *self.response.write().unwrap() = Ok(response.into());
    }

    /// Prompts received, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.read().unwrap().len()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
        self.prompts.write().unwrap().push(prompt.to_string());
        self.response
            .read()
            .unwrap()
            .clone()
            .map_err(SyncError::summarizer)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Sheet source with canned values.
#[derive(Debug, Clone, Default)]
pub struct MockSheet {
    values: SheetValues,
    fail: bool,
}

impl MockSheet {
    pub fn new(title: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        Self {
            values: SheetValues::new(title, rows),
            fail: false,
        }
    }

    /// Make every read fail.
    pub fn failing() -> Self {
        Self {
            values: SheetValues::default(),
            fail: true,
        }
    }
}

#[async_trait]
impl SheetSource for MockSheet {
    async fn read_sheet(&self, sheet: &SheetRef) -> SourceResult<SheetValues> {
        if self.fail {
            return Err(SourceError::NotFound {
                id: sheet.spreadsheet_id.clone(),
            });
        }
        Ok(self.values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_source_tree() {
        let source = MockSource::new()
            .with_folder("root", "acme", "1. Acme")
            .with_text_file("acme", "f1", "notes.txt", "hello");

        let root = source.list_children("root").await.unwrap();
        assert_eq!(root.len(), 1);
        assert!(root[0].kind.is_folder());

        let text = source.fetch_text("f1", ExportFormat::PlainText).await.unwrap();
        assert_eq!(text, "hello");
        assert_eq!(source.fetched_ids(), vec!["f1"]);
    }

    #[tokio::test]
    async fn test_mock_source_injected_failures() {
        let source = MockSource::new()
            .with_folder("root", "acme", "Acme")
            .fail_list("acme")
            .with_text_file("root", "f1", "a.txt", "x")
            .fail_fetch("f1");

        assert!(source.list_children("acme").await.is_err());
        assert!(source.fetch_bytes("f1").await.is_err());
        assert!(source.list_children("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_mock_summarizer_captures_prompts() {
        let summarizer = MockSummarizer::new("{\"sector\":\"SaaS\"}");
        let out = summarizer.complete("prompt", 100).await.unwrap();
        assert!(out.contains("SaaS"));
        assert_eq!(summarizer.prompts(), vec!["prompt"]);

        let failing = MockSummarizer::failing("quota");
        assert!(failing.complete("p", 10).await.is_err());
    }
}
