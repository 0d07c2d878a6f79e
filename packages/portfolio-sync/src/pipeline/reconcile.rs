//! Idempotent upsert against the record store.
//!
//! A record is found by its source folder id first, then by normalized name.
//! Found records get a partial update; otherwise a new record is created.
//! Running the same scan twice converges on the same records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::traits::store::{RecordFilter, RecordStore};
use crate::types::record::{name_key, CanonicalRecord, CompanyName, CompanyStatus, RecordPatch};

/// Candidate keys for finding an existing record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordKey {
    /// Stable external id (the company's source folder)
    pub source_id: Option<String>,

    /// Company name with any enumeration already stripped
    pub name: Option<String>,
}

impl RecordKey {
    pub fn new(source_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source_id: Some(source_id.into()),
            name: Some(name.into()),
        }
    }

    /// Key for rows with no source folder (the holdings sheet).
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            source_id: None,
            name: Some(name.into()),
        }
    }
}

/// How an existing record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    SourceId,
    Name,
}

/// Result of one reconcile call.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The record as stored after the write
    pub record: CanonicalRecord,

    pub created: bool,

    /// `None` when the record was created
    pub matched_by: Option<MatchedBy>,
}

impl ReconcileOutcome {
    pub fn id(&self) -> &str {
        &self.record.id
    }
}

/// Create or update the record identified by `key`.
///
/// Only fields present in `patch` are written to an existing record. New
/// records start as [`CompanyStatus::Active`] unless the patch says otherwise.
/// `created_at` is stamped once on insert; `synced_at` is stamped on every
/// call. Two concurrent calls for the same key are last-writer-wins.
pub async fn reconcile<S>(
    store: &S,
    key: &RecordKey,
    mut patch: RecordPatch,
    now: DateTime<Utc>,
) -> Result<ReconcileOutcome>
where
    S: RecordStore + ?Sized,
{
    patch.synced_at = Some(now);
    patch.created_at = None;

    if let Some((existing, matched_by)) = find_existing(store, key).await? {
        if matched_by == MatchedBy::Name && existing.source_id.is_none() {
            patch.source_id = key.source_id.clone();
        }
        debug!(id = %existing.id, ?matched_by, "Updating existing record");
        let record = store.upsert(Some(&existing.id), &patch).await?;
        return Ok(ReconcileOutcome {
            record,
            created: false,
            matched_by: Some(matched_by),
        });
    }

    if patch.name.is_none() {
        let name = key.name.as_deref().ok_or(SyncError::MissingName)?;
        patch = patch.with_name(&CompanyName::cleaned(name));
    }
    if patch.source_id.is_none() {
        patch.source_id = key.source_id.clone();
    }
    if patch.status.is_none() {
        patch.status = Some(CompanyStatus::Active);
    }
    patch.created_at = Some(now);

    let record = store.upsert(None, &patch).await?;
    debug!(id = %record.id, name = %record.name, "Created record");
    Ok(ReconcileOutcome {
        record,
        created: true,
        matched_by: None,
    })
}

async fn find_existing<S>(store: &S, key: &RecordKey) -> Result<Option<(CanonicalRecord, MatchedBy)>>
where
    S: RecordStore + ?Sized,
{
    if let Some(source_id) = &key.source_id {
        let mut found = store.find(&RecordFilter::source_id(source_id)).await?;
        if found.len() > 1 {
            warn!(source_id = %source_id, count = found.len(), "Duplicate records for source id, using the oldest");
        }
        if !found.is_empty() {
            return Ok(Some((found.remove(0), MatchedBy::SourceId)));
        }
    }

    if let Some(name) = &key.name {
        let key_name = name_key(name);
        if key_name.is_empty() {
            return Ok(None);
        }
        let found = store.find(&RecordFilter::name_key(key_name)).await?;

        // A record already bound to a different folder is another company
        let candidate = found.into_iter().find(|r| match (&r.source_id, &key.source_id) {
            (Some(stored), Some(wanted)) => stored == wanted,
            _ => true,
        });
        if let Some(record) = candidate {
            return Ok(Some((record, MatchedBy::Name)));
        }
    }

    Ok(None)
}
