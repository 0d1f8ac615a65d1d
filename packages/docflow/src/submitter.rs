//! Task submitter - load document contents and send them to the backend.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::traits::{backend::InferenceBackend, source::DocumentSource};
use crate::types::document::{Chunk, DocumentRef, SourceDocument};
use crate::types::task::{RawRecord, Task};

/// Base delay between submission retries; doubles per attempt.
const SUBMISSION_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Load every document in a chunk through the source.
///
/// A document whose load fails is not dropped: its content becomes an
/// `[ERROR: ...]` marker and it continues through the pipeline, where
/// validation will fail it with a concrete reason.
pub async fn load_documents<D: DocumentSource>(
    documents: &[DocumentRef],
    source: &D,
) -> Vec<SourceDocument> {
    let mut loaded = Vec::with_capacity(documents.len());
    for document in documents {
        match source.load(document).await {
            Ok(content) => {
                debug!(document = %document, bytes = content.len(), "loaded document");
                loaded.push(SourceDocument::new(document.clone(), content));
            }
            Err(e) => {
                warn!(document = %document, error = %e, "failed to load document");
                loaded.push(SourceDocument::new(
                    document.clone(),
                    format!("[ERROR: Failed to read file - {e}]"),
                ));
            }
        }
    }
    loaded
}

/// Submit a chunk as an asynchronous batch job.
///
/// Retries the submission with exponential backoff up to `max_retries`
/// attempts; the final error is returned for the coordinator to demote the
/// chunk's documents to `submission_failed` failure records.
pub async fn submit_chunk<B, D>(
    chunk: &Chunk,
    prompt: &str,
    max_retries: u32,
    backend: &B,
    source: &D,
) -> Result<Task>
where
    B: InferenceBackend,
    D: DocumentSource,
{
    let documents = load_documents(&chunk.documents, source).await;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match backend.submit_batch(&documents, prompt).await {
            Ok(task_id) => {
                debug!(
                    chunk = chunk.index,
                    task_id = %task_id,
                    documents = chunk.len(),
                    "submitted chunk"
                );
                return Ok(Task::new(task_id, chunk.clone()));
            }
            Err(e) if attempt < max_retries => {
                let delay = SUBMISSION_BACKOFF_BASE * 2u32.saturating_pow(attempt - 1);
                warn!(
                    chunk = chunk.index,
                    attempt,
                    max_retries,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "submission failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                warn!(
                    chunk = chunk.index,
                    attempt, "submission retries exhausted"
                );
                return Err(e);
            }
        }
    }
}

/// Process one document synchronously, with the same bounded retry.
///
/// Submission and completion collapse into one blocking call; there is no
/// task lifecycle beyond immediate success or failure.
pub async fn process_single_document<B, D>(
    document: &DocumentRef,
    prompt: &str,
    max_retries: u32,
    backend: &B,
    source: &D,
) -> Result<RawRecord>
where
    B: InferenceBackend,
    D: DocumentSource,
{
    let loaded = load_documents(std::slice::from_ref(document), source).await;
    let source_doc = loaded
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::MissingResult {
            document: document.to_string(),
        })?;

    let mut attempt = 0;
    loop {
        attempt += 1;
        match backend.process_single(&source_doc, prompt).await {
            Ok(record) => return Ok(record),
            Err(e) if attempt < max_retries => {
                let delay = SUBMISSION_BACKOFF_BASE * 2u32.saturating_pow(attempt - 1);
                warn!(
                    document = %document,
                    attempt,
                    error = %e,
                    "sync processing failed, backing off"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
