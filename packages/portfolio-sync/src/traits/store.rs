//! Record store trait.
//!
//! The store is a keyed document collection. The reconciler only needs
//! exact-match lookup, create-or-update and an ordered listing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::types::record::{CanonicalRecord, RecordPatch};

/// Field a [`RecordFilter`] compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    /// External source folder id
    SourceId,
    /// Normalized company name
    NameKey,
}

/// Exact-match filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    pub field: FilterField,
    pub equals: String,
}

impl RecordFilter {
    pub fn source_id(id: impl Into<String>) -> Self {
        Self {
            field: FilterField::SourceId,
            equals: id.into(),
        }
    }

    pub fn name_key(key: impl Into<String>) -> Self {
        Self {
            field: FilterField::NameKey,
            equals: key.into(),
        }
    }

    /// Check a record against this filter.
    pub fn matches(&self, record: &CanonicalRecord) -> bool {
        match self.field {
            FilterField::SourceId => record.source_id.as_deref() == Some(self.equals.as_str()),
            FilterField::NameKey => record.name_key == self.equals,
        }
    }
}

/// Sort order for [`RecordStore::query`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    Name,
    CreatedAt,
    SyncedAt,
}

/// Keyed store of canonical records.
///
/// Writes for different ids commute; two writes to the same id are
/// last-writer-wins.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Records matching the filter, oldest first.
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<CanonicalRecord>>;

    /// Update the record `id` with the patch, or create one when `id` is `None`.
    ///
    /// Returns the stored record after the write.
    async fn upsert(&self, id: Option<&str>, patch: &RecordPatch) -> Result<CanonicalRecord>;

    /// All records in the given order.
    async fn query(&self, order_by: OrderBy) -> Result<Vec<CanonicalRecord>>;

    /// Get a record by id.
    async fn get(&self, id: &str) -> Result<Option<CanonicalRecord>>;

    /// Number of stored records.
    async fn count(&self) -> Result<usize> {
        Ok(self.query(OrderBy::CreatedAt).await?.len())
    }
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<CanonicalRecord>> {
        (**self).find(filter).await
    }

    async fn upsert(&self, id: Option<&str>, patch: &RecordPatch) -> Result<CanonicalRecord> {
        (**self).upsert(id, patch).await
    }

    async fn query(&self, order_by: OrderBy) -> Result<Vec<CanonicalRecord>> {
        (**self).query(order_by).await
    }

    async fn get(&self, id: &str) -> Result<Option<CanonicalRecord>> {
        (**self).get(id).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}

/// Sort records in place by the given order.
pub fn sort_records(records: &mut [CanonicalRecord], order_by: OrderBy) {
    match order_by {
        OrderBy::Name => records.sort_by(|a, b| a.name_key.cmp(&b.name_key)),
        OrderBy::CreatedAt => records.sort_by_key(|r| r.created_at),
        OrderBy::SyncedAt => records.sort_by_key(|r| r.synced_at),
    }
}
