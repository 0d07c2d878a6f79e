//! Content reading: one item to bounded text.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{SourceError, SourceResult};
use crate::traits::source::ContentSource;
use crate::types::{
    config::ReaderConfig,
    item::{ContentItem, MediaKind},
    scan::{ErrorStage, ItemError},
};

/// Items read at once within one company.
const READ_CONCURRENCY: usize = 4;

/// Outcome of reading one item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadContent {
    /// Decoded text, truncated; `None` for binary kinds and failures
    pub text: Option<String>,

    /// Human label of the media kind
    pub kind: String,

    pub error_reason: Option<String>,
}

/// Read one item according to its media kind.
///
/// Never fails: a fetch or decode error is returned in `error_reason`.
/// Binary kinds are not fetched at all.
pub async fn read_content<C>(source: &C, item: &ContentItem, config: &ReaderConfig) -> ReadContent
where
    C: ContentSource + ?Sized,
{
    let kind = item.kind.label();
    match fetch(source, item).await {
        Ok(text) => ReadContent {
            text: text.map(|t| truncate_chars(&t, config.max_chars)),
            kind,
            error_reason: None,
        },
        Err(e) => {
            warn!(item = %item.name, error = %e, "Failed to read item");
            ReadContent {
                text: None,
                kind,
                error_reason: Some(e.to_string()),
            }
        }
    }
}

async fn fetch<C>(source: &C, item: &ContentItem) -> SourceResult<Option<String>>
where
    C: ContentSource + ?Sized,
{
    if let Some(format) = item.kind.export_format() {
        return source.fetch_text(&item.id, format).await.map(Some);
    }

    match &item.kind {
        MediaKind::Text(_) => {
            let bytes = source.fetch_bytes(&item.id).await?;
            String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| SourceError::Decode {
                    id: item.id.clone(),
                    reason: e.to_string(),
                })
        }
        _ => {
            debug!(item = %item.name, kind = %item.kind.label(), "Metadata only");
            Ok(None)
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

/// Items after reading, with per-item failures.
#[derive(Debug, Clone, Default)]
pub struct ReadBatch {
    /// Every item in input order, text filled in where readable
    pub items: Vec<ContentItem>,

    pub errors: Vec<ItemError>,
}

impl ReadBatch {
    /// Items that produced text.
    pub fn read_count(&self) -> usize {
        self.items.iter().filter(|i| i.text.is_some()).count()
    }

    /// Check whether any item has more than `min_chars` of text.
    pub fn has_readable_content(&self, min_chars: usize) -> bool {
        self.items.iter().any(|i| i.has_readable_text(min_chars))
    }
}

/// Read every item, a few at a time, keeping input order.
///
/// Each read is bounded by `call_timeout`. A failed or timed-out item keeps
/// its place with no text and adds an entry to [`ReadBatch::errors`].
pub async fn read_all<C>(
    source: &C,
    items: Vec<ContentItem>,
    config: &ReaderConfig,
    call_timeout: Duration,
) -> ReadBatch
where
    C: ContentSource + ?Sized,
{
    let results: Vec<(ContentItem, ReadContent)> = stream::iter(items)
        .map(|item| async move {
            let read = match tokio::time::timeout(call_timeout, read_content(source, &item, config)).await {
                Ok(read) => read,
                Err(_) => ReadContent {
                    text: None,
                    kind: item.kind.label(),
                    error_reason: Some(SourceError::Timeout { id: item.id.clone() }.to_string()),
                },
            };
            (item, read)
        })
        .buffered(READ_CONCURRENCY)
        .collect()
        .await;

    let mut batch = ReadBatch::default();
    for (mut item, read) in results {
        if let Some(reason) = &read.error_reason {
            batch
                .errors
                .push(ItemError::new(&item.name, ErrorStage::Read, reason).with_item_id(&item.id));
        }
        item.text = read.text;
        item.unreadable_reason = read.error_reason;
        batch.items.push(item);
    }
    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSource;
    use crate::types::item::{Provenance, SourceEntry, DOCUMENT_MIME};

    fn item(id: &str, mime: &str) -> ContentItem {
        ContentItem::from_entry(
            SourceEntry::new(id, format!("{}.file", id), MediaKind::from_mime(mime)),
            Provenance::Root,
        )
    }

    #[tokio::test]
    async fn test_reads_by_kind() {
        let source = MockSource::new()
            .with_file("co", SourceEntry::new("doc", "Memo", MediaKind::from_mime(DOCUMENT_MIME)), "Exported memo")
            .with_text_file("co", "txt", "notes.txt", "Plain notes")
            .with_file("co", SourceEntry::new("pdf", "Deck.pdf", MediaKind::from_mime("application/pdf")), "%PDF");

        let config = ReaderConfig::default();

        let doc = read_content(&source, &item("doc", DOCUMENT_MIME), &config).await;
        assert_eq!(doc.text.as_deref(), Some("Exported memo"));
        assert_eq!(doc.kind, "Google Doc");

        let txt = read_content(&source, &item("txt", "text/plain"), &config).await;
        assert_eq!(txt.text.as_deref(), Some("Plain notes"));

        let pdf = read_content(&source, &item("pdf", "application/pdf"), &config).await;
        assert_eq!(pdf.text, None);
        assert_eq!(pdf.kind, "PDF");
        assert_eq!(pdf.error_reason, None);

        // Binary payloads are never fetched
        assert_eq!(source.fetched_ids(), vec!["doc", "txt"]);
    }

    #[tokio::test]
    async fn test_truncates_to_max_chars() {
        let long = "é".repeat(5000);
        let source = MockSource::new().with_text_file("co", "t", "long.txt", &long);
        let read = read_content(&source, &item("t", "text/plain"), &ReaderConfig::default()).await;
        assert_eq!(read.text.unwrap().chars().count(), 4000);

        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[tokio::test]
    async fn test_invalid_utf8_becomes_error_reason() {
        let source = MockSource::new().with_file(
            "co",
            SourceEntry::new("bad", "bad.txt", MediaKind::from_mime("text/plain")),
            vec![0xff, 0xfe, 0xfd],
        );
        let read = read_content(&source, &item("bad", "text/plain"), &ReaderConfig::default()).await;
        assert_eq!(read.text, None);
        assert!(read.error_reason.unwrap().contains("cannot decode"));
    }

    #[tokio::test]
    async fn test_one_failed_read_does_not_stop_the_rest() {
        let mut source = MockSource::new();
        for i in 1..=5 {
            source = source.with_text_file("co", &format!("f{}", i), &format!("item {}", i), "some text");
        }
        let source = source.fail_fetch("f3");
        let items: Vec<_> = (1..=5).map(|i| item(&format!("f{}", i), "text/plain")).collect();

        let batch = read_all(&source, items, &ReaderConfig::default(), Duration::from_secs(5)).await;

        assert_eq!(batch.items.len(), 5);
        assert_eq!(batch.read_count(), 4);
        assert_eq!(batch.errors.len(), 1);
        assert_eq!(batch.errors[0].item_id.as_deref(), Some("f3"));
        assert_eq!(batch.errors[0].stage, ErrorStage::Read);
        assert!(batch.items[2].unreadable_reason.is_some());
        assert!(batch.items[3].text.is_some());
        assert!(batch.items[4].text.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_times_out() {
        let source = MockSource::new()
            .with_text_file("co", "slow", "slow.txt", "text")
            .with_delay(Duration::from_secs(60));
        let batch = read_all(
            &source,
            vec![item("slow", "text/plain")],
            &ReaderConfig::default(),
            Duration::from_secs(1),
        )
        .await;
        assert_eq!(batch.read_count(), 0);
        assert!(batch.errors[0].reason.contains("timeout"));
    }
}
