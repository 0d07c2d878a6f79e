//! In-memory record store for testing and development.

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::traits::store::{sort_records, OrderBy, RecordFilter, RecordStore};
use crate::types::record::{CanonicalRecord, RecordPatch};

/// In-memory keyed record collection.
///
/// Records keep insertion order. Useful for testing and development. Not
/// suitable for production as data is lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<IndexMap<String, CanonicalRecord>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Get the number of stored records.
    pub fn len(&self) -> usize {
        self.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every record in insertion order.
    pub fn snapshot(&self) -> Result<Vec<CanonicalRecord>> {
        Ok(self.read()?.values().cloned().collect())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexMap<String, CanonicalRecord>>> {
        self.records
            .read()
            .map_err(|e| SyncError::storage(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexMap<String, CanonicalRecord>>> {
        self.records
            .write()
            .map_err(|e| SyncError::storage(e.to_string()))
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<CanonicalRecord>> {
        Ok(self
            .read()?
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn upsert(&self, id: Option<&str>, patch: &RecordPatch) -> Result<CanonicalRecord> {
        let mut records = self.write()?;
        match id {
            Some(id) => {
                let record = records
                    .get_mut(id)
                    .ok_or_else(|| SyncError::RecordNotFound { id: id.to_string() })?;
                patch.apply_to(record);
                Ok(record.clone())
            }
            None => {
                let record = patch.clone().into_record(Uuid::now_v7().to_string(), Utc::now())?;
                records.insert(record.id.clone(), record.clone());
                Ok(record)
            }
        }
    }

    async fn query(&self, order_by: OrderBy) -> Result<Vec<CanonicalRecord>> {
        let mut records = self.snapshot()?;
        sort_records(&mut records, order_by);
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<CanonicalRecord>> {
        Ok(self.read()?.get(id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::CompanyName;

    fn named(name: &str) -> RecordPatch {
        RecordPatch::new().with_name(&CompanyName::parse(name))
    }

    #[tokio::test]
    async fn test_create_then_update() {
        let store = MemoryStore::new();

        let created = store.upsert(None, &named("Acme").with_source_id("f1")).await.unwrap();
        assert_eq!(store.len(), 1);

        let patch = RecordPatch {
            sector: Some("SaaS".into()),
            ..Default::default()
        };
        let updated = store.upsert(Some(&created.id), &patch).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.sector.as_deref(), Some("SaaS"));
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_unknown_id_fails() {
        let store = MemoryStore::new();
        let err = store.upsert(Some("nope"), &named("Acme")).await.unwrap_err();
        assert!(matches!(err, SyncError::RecordNotFound { .. }));
    }

    #[tokio::test]
    async fn test_find_and_query() {
        let store = MemoryStore::new();
        store.upsert(None, &named("Zeta").with_source_id("z")).await.unwrap();
        store.upsert(None, &named("Alpha")).await.unwrap();

        let found = store.find(&RecordFilter::source_id("z")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Zeta");

        let by_name = store.find(&RecordFilter::name_key("alpha")).await.unwrap();
        assert_eq!(by_name.len(), 1);

        let ordered = store.query(OrderBy::Name).await.unwrap();
        assert_eq!(ordered[0].name, "Alpha");

        let fetched = store.get(&found[0].id).await.unwrap();
        assert_eq!(fetched.map(|r| r.name), Some("Zeta".to_string()));
    }
}
