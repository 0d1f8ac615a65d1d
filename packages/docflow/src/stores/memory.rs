//! In-memory record store for testing and development.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::Result;
use crate::traits::store::{RecordStore, StoredRecord};
use crate::types::document::DocumentRef;
use crate::types::record::ValidatedRecord;

/// In-memory storage for validated records.
///
/// Useful for testing and development. Not suitable for production as data
/// is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<(Uuid, DocumentRef), StoredRecord>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
    }

    /// Total records across all runs.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn write_record(&self, run_id: Uuid, record: &ValidatedRecord) -> Result<()> {
        let stored = StoredRecord {
            run_id,
            document: record.document.clone(),
            task_id: record.task_id.clone(),
            data: record.data.clone(),
            written_at: Utc::now(),
        };

        let key = (run_id, record.document.clone());
        let mut records = self.records.write().unwrap();

        // Last-writer-wins on the write timestamp.
        match records.get(&key) {
            Some(existing) if existing.written_at > stored.written_at => {}
            _ => {
                records.insert(key, stored);
            }
        }

        Ok(())
    }

    async fn get_record(
        &self,
        run_id: Uuid,
        document: &DocumentRef,
    ) -> Result<Option<StoredRecord>> {
        Ok(self
            .records
            .read()
            .unwrap()
            .get(&(run_id, document.clone()))
            .cloned())
    }

    async fn count_records(&self, run_id: Uuid) -> Result<usize> {
        Ok(self
            .records
            .read()
            .unwrap()
            .keys()
            .filter(|(run, _)| *run == run_id)
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::ExtractedDocument;

    fn record(path: &str, title: &str) -> ValidatedRecord {
        ValidatedRecord::new(
            path,
            "task-1",
            ExtractedDocument::new(title, "some extracted body text"),
        )
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let store = MemoryStore::new();
        let run_id = Uuid::new_v4();

        store.write_record(run_id, &record("a.txt", "A")).await.unwrap();

        let stored = store
            .get_record(run_id, &DocumentRef::new("a.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data.title, "A");
        assert_eq!(stored.task_id, "task-1");
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent() {
        let store = MemoryStore::new();
        let run_id = Uuid::new_v4();

        store.write_record(run_id, &record("a.txt", "first")).await.unwrap();
        store.write_record(run_id, &record("a.txt", "second")).await.unwrap();

        // One stored record, not two; the later write wins.
        assert_eq!(store.count_records(run_id).await.unwrap(), 1);
        let stored = store
            .get_record(run_id, &DocumentRef::new("a.txt"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.data.title, "second");
    }

    #[tokio::test]
    async fn test_runs_are_isolated() {
        let store = MemoryStore::new();
        let run_a = Uuid::new_v4();
        let run_b = Uuid::new_v4();

        store.write_record(run_a, &record("a.txt", "A")).await.unwrap();
        store.write_record(run_b, &record("a.txt", "A again")).await.unwrap();

        assert_eq!(store.count_records(run_a).await.unwrap(), 1);
        assert_eq!(store.count_records(run_b).await.unwrap(), 1);
        assert_eq!(store.record_count(), 2);
    }
}
