//! Scan results and per-item failures.

use serde::Serialize;

use crate::types::record::CanonicalRecord;

/// Pipeline step at which an item failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStage {
    List,
    Read,
    Summarize,
    Reconcile,
    Deadline,
    Cancelled,
}

/// A failure confined to one item, folder or row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemError {
    /// Display name of the failed item
    pub item: String,

    /// Source identifier, when there is one
    pub item_id: Option<String>,

    pub stage: ErrorStage,
    pub reason: String,
}

impl ItemError {
    pub fn new(item: impl Into<String>, stage: ErrorStage, reason: impl ToString) -> Self {
        Self {
            item: item.into(),
            item_id: None,
            stage,
            reason: reason.to_string(),
        }
    }

    pub fn with_item_id(mut self, id: impl Into<String>) -> Self {
        self.item_id = Some(id.into());
        self
    }
}

/// Records produced by a scan, with everything that went wrong on the way.
///
/// A scan always returns what it managed to do; failures are listed in
/// `errors` rather than aborting the batch.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    /// Reconciled records, in source order
    pub records: Vec<CanonicalRecord>,

    pub errors: Vec<ItemError>,

    /// Records created by this scan
    pub created: usize,

    /// Existing records updated by this scan
    pub updated: usize,

    /// Stopped early because the deadline passed
    pub deadline_hit: bool,

    /// Stopped early because the caller cancelled
    pub cancelled: bool,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if every item succeeded.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Stopped before processing every item.
    pub fn is_partial(&self) -> bool {
        self.deadline_hit || self.cancelled
    }

    pub fn push_error(&mut self, error: ItemError) {
        self.errors.push(error);
    }

    /// Record one reconciled record.
    pub fn push_record(&mut self, record: CanonicalRecord, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
        self.records.push(record);
    }
}
