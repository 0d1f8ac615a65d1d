//! Failure recorder - collect failures and serialize the retry artifact.
//!
//! The retry artifact is CSV with columns
//! `file_path,reason,task_id,timestamp,attempts`. Its first column is a
//! document reference, which makes the file directly re-ingestible as
//! chunker input: the retry loop is closed.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::types::document::DocumentRef;
use crate::types::record::{FailureReason, FailureRecord};

/// Append-safe collector of failure records for one run.
///
/// Safe to share across concurrently processed chunks. Records are deduped
/// on `(document, attempts)` so a redundant report of the same attempt is
/// dropped, never duplicated; insertion order is preserved.
#[derive(Debug, Default)]
pub struct FailureLog {
    records: Mutex<IndexMap<(DocumentRef, u32), FailureRecord>>,
}

impl FailureLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure. Re-recording the same (document, attempt) pair
    /// is a no-op.
    pub fn record(&self, record: FailureRecord) {
        let key = (record.document.clone(), record.attempts);
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&key) {
            debug!(document = %record.document, attempts = record.attempts, "duplicate failure ignored");
            return;
        }
        records.insert(key, record);
    }

    /// Record a batch of failures.
    pub fn record_all(&self, records: impl IntoIterator<Item = FailureRecord>) {
        for record in records {
            self.record(record);
        }
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether no failures were recorded.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }

    /// Snapshot of the recorded failures in insertion order.
    pub fn snapshot(&self) -> Vec<FailureRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    /// Serialize all recorded failures into the CSV retry artifact.
    pub fn write_retry_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let records = self.snapshot();
        write_retry_file(path, &records)
    }
}

/// One row of the retry artifact.
#[derive(Debug, Serialize, Deserialize)]
struct RetryRow {
    file_path: String,
    reason: FailureReason,
    task_id: Option<String>,
    timestamp: DateTime<Utc>,
    attempts: u32,
}

/// A retry artifact entry read back as pipeline input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEntry {
    /// The document to reprocess
    pub document: DocumentRef,

    /// Attempts the document has already consumed
    pub attempts: u32,
}

/// Write failure records to a retry artifact at `path`.
pub fn write_retry_file(path: impl AsRef<Path>, records: &[FailureRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;

    for record in records {
        writer.serialize(RetryRow {
            file_path: record.document.to_string(),
            reason: record.reason,
            task_id: record.task_id.clone(),
            timestamp: record.failed_at,
            attempts: record.attempts,
        })?;
    }
    writer.flush()?;

    info!(
        path = %path.as_ref().display(),
        records = records.len(),
        "wrote retry artifact"
    );
    Ok(())
}

/// Read a retry artifact back as `(document, attempts)` entries.
pub fn read_retry_file(path: impl AsRef<Path>) -> Result<Vec<RetryEntry>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut entries = Vec::new();

    for row in reader.deserialize::<RetryRow>() {
        let row = row?;
        entries.push(RetryEntry {
            document: DocumentRef::new(row.file_path),
            attempts: row.attempts,
        });
    }

    Ok(entries)
}

/// Read an ordered document list from a CSV file's first column.
///
/// Accepts both a plain input list (header + one path per row) and the
/// retry artifact itself, whose first column is also a document reference.
pub fn read_document_list(path: impl AsRef<Path>) -> Result<Vec<DocumentRef>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut documents = Vec::new();

    for row in reader.records() {
        let row = row?;
        if let Some(first) = row.get(0) {
            if !first.trim().is_empty() {
                documents.push(DocumentRef::new(first.trim()));
            }
        }
    }

    Ok(documents)
}
