//! Record store trait for durable persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::types::document::DocumentRef;
use crate::types::record::{ExtractedDocument, ValidatedRecord};

/// A persisted extraction record, as read back from storage.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Run the record belongs to
    pub run_id: Uuid,

    /// The document the record was extracted from
    pub document: DocumentRef,

    /// Identifier of the task that produced it
    pub task_id: String,

    /// The structured payload
    pub data: ExtractedDocument,

    /// When the record was written (last-writer-wins basis)
    pub written_at: DateTime<Utc>,
}

/// Durable storage for validated records.
///
/// Writes are keyed by `(run_id, document)` and idempotent: re-writing the
/// same key overwrites rather than duplicates. Concurrent writers for
/// different documents never contend; same-key concurrent writes resolve
/// last-writer-wins on the write timestamp.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write a validated record, stamping the write time.
    async fn write_record(&self, run_id: Uuid, record: &ValidatedRecord) -> Result<()>;

    /// Read a record back by key.
    async fn get_record(
        &self,
        run_id: Uuid,
        document: &DocumentRef,
    ) -> Result<Option<StoredRecord>>;

    /// Count records persisted for a run.
    async fn count_records(&self, run_id: Uuid) -> Result<usize>;
}

// Shared handles delegate, so an Arc'd store is itself a store.
#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for std::sync::Arc<T> {
    async fn write_record(&self, run_id: Uuid, record: &ValidatedRecord) -> Result<()> {
        (**self).write_record(run_id, record).await
    }

    async fn get_record(
        &self,
        run_id: Uuid,
        document: &DocumentRef,
    ) -> Result<Option<StoredRecord>> {
        (**self).get_record(run_id, document).await
    }

    async fn count_records(&self, run_id: Uuid) -> Result<usize> {
        (**self).count_records(run_id).await
    }
}
