//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the pipeline without
//! making real inference or network calls.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::traits::{
    backend::InferenceBackend,
    source::DocumentSource,
    store::{RecordStore, StoredRecord},
};
use crate::types::document::{DocumentRef, SourceDocument};
use crate::types::record::ValidatedRecord;
use crate::types::task::{BackendJobStatus, RawRecord, TokenUsage};

/// Record of a call made to the mock backend.
#[derive(Debug, Clone)]
pub enum BackendCall {
    SubmitBatch { task_id: String, documents: usize },
    PollTask { task_id: String },
    FetchResults { task_id: String },
    ProcessSingle { document: String },
}

struct TaskFixture {
    documents: Vec<SourceDocument>,
    script: VecDeque<BackendJobStatus>,
}

/// A mock inference backend with scripted behavior.
///
/// By default every submitted task reports done on its first poll and
/// returns a well-formed extraction record per document. Builders configure
/// submission failures, poll scripts, dropped documents and bad payloads.
#[derive(Default)]
pub struct MockBackend {
    status_script: Vec<BackendJobStatus>,
    never_finish: bool,
    failing_submissions: AtomicU32,
    failing_single_calls: AtomicU32,
    dropped: HashSet<String>,
    payload_overrides: HashMap<String, String>,
    tasks: Mutex<HashMap<String, TaskFixture>>,
    next_task: AtomicUsize,
    submission_attempts: AtomicUsize,
    calls: Mutex<Vec<BackendCall>>,
}

impl MockBackend {
    /// Create a mock backend with default behavior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every new task follows this status sequence, one entry per poll.
    /// Polls past the end of the script report done.
    pub fn with_status_script(mut self, script: Vec<BackendJobStatus>) -> Self {
        self.status_script = script;
        self
    }

    /// Every poll reports running; tasks never finish.
    pub fn with_never_finishing_tasks(mut self) -> Self {
        self.never_finish = true;
        self
    }

    /// The first `count` batch submissions fail.
    pub fn with_failing_submissions(self, count: u32) -> Self {
        self.failing_submissions.store(count, Ordering::SeqCst);
        self
    }

    /// The first `count` sync calls fail.
    pub fn with_failing_single_calls(self, count: u32) -> Self {
        self.failing_single_calls.store(count, Ordering::SeqCst);
        self
    }

    /// Omit this document from every result set (simulates the backend
    /// silently dropping an input).
    pub fn with_dropped_document(mut self, path: impl Into<String>) -> Self {
        self.dropped.insert(path.into());
        self
    }

    /// Return this raw payload for the document instead of well-formed JSON.
    pub fn with_payload(mut self, path: impl Into<String>, payload: impl Into<String>) -> Self {
        self.payload_overrides.insert(path.into(), payload.into());
        self
    }

    /// All calls made to this mock, in order. Rejected submissions are not
    /// listed; count them with [`submission_attempts`](Self::submission_attempts).
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Batch submission attempts, accepted and rejected alike.
    pub fn submission_attempts(&self) -> usize {
        self.submission_attempts.load(Ordering::SeqCst)
    }

    /// Number of status queries made for a task.
    pub fn poll_count(&self, task_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, BackendCall::PollTask { task_id: id } if id == task_id))
            .count()
    }

    fn record_call(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn record_for(&self, document: &DocumentRef) -> RawRecord {
        let content = match self.payload_overrides.get(document.as_str()) {
            Some(payload) => payload.clone(),
            None => serde_json::json!({
                "title": format!("Extracted from {document}"),
                "content": format!("Structured summary of the contents of {document}."),
            })
            .to_string(),
        };

        RawRecord::new(document.clone(), content)
            .with_model_version("mock-model-1")
            .with_usage(TokenUsage {
                prompt_tokens: 120,
                completion_tokens: 40,
                total_tokens: 160,
            })
    }

    fn submission_error() -> PipelineError {
        PipelineError::Submission(Box::new(std::io::Error::other(
            "mock backend rejected the submission",
        )))
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    async fn submit_batch(&self, documents: &[SourceDocument], _prompt: &str) -> Result<String> {
        self.submission_attempts.fetch_add(1, Ordering::SeqCst);

        let remaining = self.failing_submissions.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_submissions.store(remaining - 1, Ordering::SeqCst);
            return Err(Self::submission_error());
        }

        let task_id = format!("task-{}", self.next_task.fetch_add(1, Ordering::SeqCst));
        self.record_call(BackendCall::SubmitBatch {
            task_id: task_id.clone(),
            documents: documents.len(),
        });

        self.tasks.lock().unwrap().insert(
            task_id.clone(),
            TaskFixture {
                documents: documents.to_vec(),
                script: self.status_script.iter().cloned().collect(),
            },
        );

        Ok(task_id)
    }

    async fn poll_task(&self, task_id: &str) -> Result<BackendJobStatus> {
        self.record_call(BackendCall::PollTask {
            task_id: task_id.to_string(),
        });

        if self.never_finish {
            return Ok(BackendJobStatus::Running);
        }

        let mut tasks = self.tasks.lock().unwrap();
        let fixture = tasks.get_mut(task_id).ok_or_else(|| PipelineError::Backend {
            task_id: task_id.to_string(),
            message: "unknown task".to_string(),
        })?;

        Ok(fixture
            .script
            .pop_front()
            .unwrap_or(BackendJobStatus::Done))
    }

    async fn fetch_results(&self, task_id: &str) -> Result<Vec<RawRecord>> {
        self.record_call(BackendCall::FetchResults {
            task_id: task_id.to_string(),
        });

        let tasks = self.tasks.lock().unwrap();
        let fixture = tasks.get(task_id).ok_or_else(|| PipelineError::Backend {
            task_id: task_id.to_string(),
            message: "unknown task".to_string(),
        })?;

        Ok(fixture
            .documents
            .iter()
            .filter(|doc| !self.dropped.contains(doc.document.as_str()))
            .map(|doc| self.record_for(&doc.document))
            .collect())
    }

    async fn process_single(&self, document: &SourceDocument, _prompt: &str) -> Result<RawRecord> {
        let remaining = self.failing_single_calls.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_single_calls.store(remaining - 1, Ordering::SeqCst);
            return Err(Self::submission_error());
        }

        self.record_call(BackendCall::ProcessSingle {
            document: document.document.to_string(),
        });

        Ok(self.record_for(&document.document))
    }
}

/// A mock document source backed by an in-memory map.
///
/// Unknown documents fail to load unless
/// [`with_default_content`](Self::with_default_content) is set, in which
/// case they resolve to synthetic text.
#[derive(Debug, Default)]
pub struct MockSource {
    contents: HashMap<String, String>,
    default_content: bool,
}

impl MockSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register content for a document.
    pub fn with_document(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.contents.insert(path.into(), content.into());
        self
    }

    /// Resolve unknown documents to synthetic text instead of failing.
    pub fn with_default_content(mut self) -> Self {
        self.default_content = true;
        self
    }
}

#[async_trait]
impl DocumentSource for MockSource {
    async fn load(&self, document: &DocumentRef) -> Result<String> {
        if let Some(content) = self.contents.get(document.as_str()) {
            return Ok(content.clone());
        }
        if self.default_content {
            return Ok(format!("Synthetic contents of {document}."));
        }
        Err(PipelineError::Source {
            document: document.to_string(),
            message: "not found".to_string(),
        })
    }
}

/// A record store that fails writes for configured documents, delegating
/// everything else to an inner [`MemoryStore`](crate::stores::MemoryStore).
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: crate::stores::MemoryStore,
    fail_documents: HashSet<String>,
}

impl FlakyStore {
    /// Create a store that fails no writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write for this document.
    pub fn with_failing_document(mut self, path: impl Into<String>) -> Self {
        self.fail_documents.insert(path.into());
        self
    }

    /// The wrapped in-memory store.
    pub fn inner(&self) -> &crate::stores::MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn write_record(&self, run_id: Uuid, record: &ValidatedRecord) -> Result<()> {
        if self.fail_documents.contains(record.document.as_str()) {
            return Err(PipelineError::Storage(Box::new(std::io::Error::other(
                "mock storage rejected the write",
            ))));
        }
        self.inner.write_record(run_id, record).await
    }

    async fn get_record(
        &self,
        run_id: Uuid,
        document: &DocumentRef,
    ) -> Result<Option<StoredRecord>> {
        self.inner.get_record(run_id, document).await
    }

    async fn count_records(&self, run_id: Uuid) -> Result<usize> {
        self.inner.count_records(run_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_task_completes_first_poll() {
        let backend = MockBackend::new();
        let docs = vec![SourceDocument::new("a.txt", "text")];
        let task_id = backend.submit_batch(&docs, "extract").await.unwrap();

        let status = backend.poll_task(&task_id).await.unwrap();
        assert_eq!(status, BackendJobStatus::Done);

        let records = backend.fetch_results(&task_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document.as_str(), "a.txt");
    }

    #[tokio::test]
    async fn test_dropped_document_missing_from_results() {
        let backend = MockBackend::new().with_dropped_document("b.txt");
        let docs = vec![
            SourceDocument::new("a.txt", "text"),
            SourceDocument::new("b.txt", "text"),
        ];
        let task_id = backend.submit_batch(&docs, "extract").await.unwrap();

        let records = backend.fetch_results(&task_id).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document.as_str(), "a.txt");
    }

    #[tokio::test]
    async fn test_script_drives_poll_sequence() {
        let backend = MockBackend::new().with_status_script(vec![
            BackendJobStatus::Queued,
            BackendJobStatus::Running,
        ]);
        let docs = vec![SourceDocument::new("a.txt", "text")];
        let task_id = backend.submit_batch(&docs, "extract").await.unwrap();

        assert_eq!(backend.poll_task(&task_id).await.unwrap(), BackendJobStatus::Queued);
        assert_eq!(backend.poll_task(&task_id).await.unwrap(), BackendJobStatus::Running);
        assert_eq!(backend.poll_task(&task_id).await.unwrap(), BackendJobStatus::Done);
    }
}
