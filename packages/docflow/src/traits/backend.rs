//! Inference backend trait.
//!
//! Abstracts the remote AI service behind the pipeline: asynchronous batch
//! jobs (submit, poll, fetch) and one-shot synchronous calls. The Gemini
//! implementation lives behind the `gemini` feature; tests use the mock in
//! [`crate::testing`].

use async_trait::async_trait;

use crate::error::Result;
use crate::types::document::SourceDocument;
use crate::types::task::{BackendJobStatus, RawRecord};

/// Remote inference service operations.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Submit a batch of documents for asynchronous processing.
    ///
    /// Fire-and-forget: the backend acknowledges receipt and begins work.
    /// Returns the opaque task identifier used for polling. Fails with
    /// [`PipelineError::Submission`](crate::error::PipelineError::Submission)
    /// on network/auth/rate-limit rejection.
    async fn submit_batch(&self, documents: &[SourceDocument], prompt: &str) -> Result<String>;

    /// Query the current status of a submitted task.
    async fn poll_task(&self, task_id: &str) -> Result<BackendJobStatus>;

    /// Fetch the results of a task the backend reported done.
    ///
    /// Returns one raw record per document the backend actually processed;
    /// the validator treats absences as failures, not omissions.
    async fn fetch_results(&self, task_id: &str) -> Result<Vec<RawRecord>>;

    /// Process a single document synchronously.
    ///
    /// The call blocks until the backend returns a result, collapsing
    /// submission and completion into one step.
    async fn process_single(&self, document: &SourceDocument, prompt: &str) -> Result<RawRecord>;
}

// Shared handles delegate, so an Arc'd backend is itself a backend.
#[async_trait]
impl<T: InferenceBackend + ?Sized> InferenceBackend for std::sync::Arc<T> {
    async fn submit_batch(&self, documents: &[SourceDocument], prompt: &str) -> Result<String> {
        (**self).submit_batch(documents, prompt).await
    }

    async fn poll_task(&self, task_id: &str) -> Result<BackendJobStatus> {
        (**self).poll_task(task_id).await
    }

    async fn fetch_results(&self, task_id: &str) -> Result<Vec<RawRecord>> {
        (**self).fetch_results(task_id).await
    }

    async fn process_single(&self, document: &SourceDocument, prompt: &str) -> Result<RawRecord> {
        (**self).process_single(document, prompt).await
    }
}
