//! Pipeline coordinator - sequence chunks through submission, polling,
//! validation, persistence and failure recording.
//!
//! The coordinator owns the documents-terminate invariant: every input
//! document ends as exactly one persisted record or one recorded failure.
//! No error from an inner stage escapes `run` except
//! [`InvalidConfiguration`](crate::error::PipelineError::InvalidConfiguration).

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunker::chunk_documents;
use crate::error::{PipelineError, Result};
use crate::poller::poll_until_terminal;
use crate::recorder::{FailureLog, RetryEntry};
use crate::submitter::{process_single_document, submit_chunk};
use crate::traits::{backend::InferenceBackend, source::DocumentSource, store::RecordStore};
use crate::types::config::{PipelineConfig, ProcessingMode};
use crate::types::document::{Chunk, DocumentRef};
use crate::types::record::{FailureReason, FailureRecord, ValidatedRecord};
use crate::types::stats::{RunReport, RunStats};
use crate::types::task::TaskOutcome;
use crate::validator::{default_checks, validate_task_result, QualityCheck};

/// A document awaiting processing, with its consumed-attempts counter.
#[derive(Debug, Clone)]
struct PendingDocument {
    document: DocumentRef,
    attempts: u32,
}

/// Everything one chunk (or one sync document) produced.
#[derive(Debug, Default)]
struct ChunkOutcome {
    stats: RunStats,
    failures: Vec<FailureRecord>,
}

impl ChunkOutcome {
    fn all_failed(chunk: &Chunk, reason: FailureReason, task_id: Option<&str>) -> Self {
        let failures = chunk
            .documents
            .iter()
            .map(|document| {
                let mut record = FailureRecord::new(document.clone(), reason);
                if let Some(task_id) = task_id {
                    record = record.with_task_id(task_id);
                }
                record
            })
            .collect();
        Self {
            stats: RunStats::default(),
            failures,
        }
    }
}

/// Coordinates a full pipeline run over an inference backend, a record
/// store and a document source.
///
/// # Example
///
/// ```rust,ignore
/// use docflow::{Pipeline, PipelineConfig, MemoryStore, FileSource};
///
/// let pipeline = Pipeline::new(backend, MemoryStore::new(), FileSource::new(), PipelineConfig::default())?;
/// let report = pipeline.run(documents).await?;
/// println!("validated {} of {}", report.stats.validated, report.stats.terminated());
/// ```
pub struct Pipeline<B, S, D> {
    backend: Arc<B>,
    store: Arc<S>,
    source: Arc<D>,
    config: PipelineConfig,
    checks: Vec<QualityCheck>,
    run_id: Uuid,
    cancel: CancellationToken,
}

impl<B, S, D> Pipeline<B, S, D>
where
    B: InferenceBackend + 'static,
    S: RecordStore + 'static,
    D: DocumentSource + 'static,
{
    /// Create a pipeline, validating the configuration up front.
    pub fn new(backend: B, store: S, source: D, config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            backend: Arc::new(backend),
            store: Arc::new(store),
            source: Arc::new(source),
            config,
            checks: default_checks(),
            run_id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replace the quality check set.
    pub fn with_checks(mut self, checks: Vec<QualityCheck>) -> Self {
        self.checks = checks;
        self
    }

    /// This run's identifier (persistence key component).
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// A token that cancels the run when triggered.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop issuing new submissions. In-flight tasks are abandoned and
    /// their documents recorded as `cancelled` failures.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Process a fresh document list.
    pub async fn run(&self, documents: Vec<DocumentRef>) -> Result<RunReport> {
        let pending = documents
            .into_iter()
            .map(|document| PendingDocument {
                document,
                attempts: 0,
            })
            .collect();
        self.run_pending(pending).await
    }

    /// Re-process documents from a retry artifact, honoring the attempts
    /// each one has already consumed.
    pub async fn resume(&self, entries: Vec<RetryEntry>) -> Result<RunReport> {
        let pending = entries
            .into_iter()
            .map(|entry| PendingDocument {
                document: entry.document,
                attempts: entry.attempts,
            })
            .collect();
        self.run_pending(pending).await
    }

    async fn run_pending(&self, mut pending: Vec<PendingDocument>) -> Result<RunReport> {
        if pending.is_empty() {
            return Err(PipelineError::invalid_config("no documents to process"));
        }

        pending = dedupe_pending(pending);

        let log = FailureLog::new();
        let mut stats = RunStats::default();
        let mut round = 0u32;

        while !pending.is_empty() {
            round += 1;
            info!(
                run_id = %self.run_id,
                round,
                documents = pending.len(),
                mode = ?self.config.mode,
                "processing round"
            );

            let failures = match self.config.mode {
                ProcessingMode::Batch => self.batch_round(&pending, &mut stats).await?,
                ProcessingMode::Sync => self.sync_round(&pending, &mut stats).await,
            };

            pending = self.partition_retries(failures, &log, &mut stats);
        }

        stats.failed = log.len();
        info!(
            run_id = %self.run_id,
            submitted = stats.submitted,
            completed = stats.completed,
            validated = stats.validated,
            failed = stats.failed,
            retried = stats.retried,
            "run finished"
        );

        Ok(RunReport {
            run_id: self.run_id,
            stats,
            failures: log.snapshot(),
        })
    }

    /// Decide, per fresh failure, between another round and permanent
    /// recording. Returns the next round's pending set.
    fn partition_retries(
        &self,
        failures: Vec<FailureRecord>,
        log: &FailureLog,
        stats: &mut RunStats,
    ) -> Vec<PendingDocument> {
        let mut next = Vec::new();

        for failure in failures {
            let within_budget = failure.attempts < self.config.max_document_retries;
            if failure.reason.is_retryable() && within_budget && !self.cancel.is_cancelled() {
                debug!(
                    document = %failure.document,
                    reason = %failure.reason,
                    attempts = failure.attempts,
                    "requeueing document"
                );
                stats.retried += 1;
                next.push(PendingDocument {
                    document: failure.document,
                    attempts: failure.attempts,
                });
            } else {
                log.record(failure);
            }
        }

        next
    }

    async fn batch_round(
        &self,
        pending: &[PendingDocument],
        stats: &mut RunStats,
    ) -> Result<Vec<FailureRecord>> {
        let documents: Vec<DocumentRef> =
            pending.iter().map(|p| p.document.clone()).collect();
        let attempts: HashMap<DocumentRef, u32> = pending
            .iter()
            .map(|p| (p.document.clone(), p.attempts))
            .collect();

        let chunks = chunk_documents(&documents, self.config.chunk_size)?;

        let mut handles = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk = chunk.clone();
            let backend = Arc::clone(&self.backend);
            let store = Arc::clone(&self.store);
            let source = Arc::clone(&self.source);
            let config = self.config.clone();
            let checks = self.checks.clone();
            let run_id = self.run_id;
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                process_chunk(chunk, backend, store, source, config, checks, run_id, cancel)
                    .await
            }));
        }

        let mut failures = Vec::new();
        for (result, chunk) in futures::future::join_all(handles).await.into_iter().zip(&chunks) {
            match result {
                Ok(outcome) => {
                    stats.merge(outcome.stats);
                    failures.extend(outcome.failures);
                }
                Err(e) => {
                    // A panicked chunk task must not lose its documents.
                    warn!(chunk = chunk.index, error = %e, "chunk task aborted");
                    failures.extend(
                        ChunkOutcome::all_failed(chunk, FailureReason::BackendError, None)
                            .failures,
                    );
                }
            }
        }

        stamp_attempts(&mut failures, &attempts);
        Ok(failures)
    }

    async fn sync_round(
        &self,
        pending: &[PendingDocument],
        stats: &mut RunStats,
    ) -> Vec<FailureRecord> {
        let attempts: HashMap<DocumentRef, u32> = pending
            .iter()
            .map(|p| (p.document.clone(), p.attempts))
            .collect();

        let mut handles = Vec::with_capacity(pending.len());
        for (index, entry) in pending.iter().enumerate() {
            let document = entry.document.clone();
            let backend = Arc::clone(&self.backend);
            let store = Arc::clone(&self.store);
            let source = Arc::clone(&self.source);
            let config = self.config.clone();
            let checks = self.checks.clone();
            let run_id = self.run_id;
            let cancel = self.cancel.clone();

            handles.push(tokio::spawn(async move {
                process_sync_document(
                    index, document, backend, store, source, config, checks, run_id, cancel,
                )
                .await
            }));
        }

        let mut failures = Vec::new();
        for (result, entry) in futures::future::join_all(handles).await.into_iter().zip(pending) {
            match result {
                Ok(outcome) => {
                    stats.merge(outcome.stats);
                    failures.extend(outcome.failures);
                }
                Err(e) => {
                    warn!(document = %entry.document, error = %e, "document task aborted");
                    failures.push(FailureRecord::new(
                        entry.document.clone(),
                        FailureReason::BackendError,
                    ));
                }
            }
        }

        stamp_attempts(&mut failures, &attempts);
        failures
    }
}

/// Drop repeated document references, keeping the first occurrence.
fn dedupe_pending(pending: Vec<PendingDocument>) -> Vec<PendingDocument> {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::with_capacity(pending.len());
    for entry in pending {
        if seen.insert(entry.document.clone()) {
            unique.push(entry);
        } else {
            warn!(document = %entry.document, "duplicate document reference dropped");
        }
    }
    unique
}

/// Stamp each failure with the attempts its document has now consumed.
fn stamp_attempts(failures: &mut [FailureRecord], attempts: &HashMap<DocumentRef, u32>) {
    for failure in failures {
        let consumed = attempts.get(&failure.document).copied().unwrap_or(0);
        failure.attempts = consumed + 1;
    }
}

/// Process one chunk end to end: submit → poll → validate → persist.
///
/// Never returns an error: every stage failure is converted into failure
/// records for the chunk's documents.
#[allow(clippy::too_many_arguments)]
async fn process_chunk<B, S, D>(
    chunk: Chunk,
    backend: Arc<B>,
    store: Arc<S>,
    source: Arc<D>,
    config: PipelineConfig,
    checks: Vec<QualityCheck>,
    run_id: Uuid,
    cancel: CancellationToken,
) -> ChunkOutcome
where
    B: InferenceBackend,
    S: RecordStore,
    D: DocumentSource,
{
    if cancel.is_cancelled() {
        return ChunkOutcome::all_failed(&chunk, FailureReason::Cancelled, None);
    }

    let mut task = match submit_chunk(
        &chunk,
        &config.processing_prompt,
        config.submission_max_retries,
        &*backend,
        &*source,
    )
    .await
    {
        Ok(task) => task,
        Err(e) => {
            warn!(chunk = chunk.index, error = %e, "chunk submission failed");
            return ChunkOutcome::all_failed(&chunk, FailureReason::SubmissionFailed, None);
        }
    };

    let mut outcome = ChunkOutcome::default();
    outcome.stats.submitted = chunk.len();

    match poll_until_terminal(&mut task, &*backend, &config.poll, &cancel).await {
        Ok(TaskOutcome::Completed(records)) => {
            outcome.stats.completed = chunk.len();
            let report = validate_task_result(&chunk, &records, &checks, &task.id);

            for record in report.valid {
                write_or_demote(&*store, run_id, record, &task.id, &mut outcome).await;
            }
            outcome.failures.extend(report.invalid);
        }
        Ok(TaskOutcome::Failed(message)) => {
            warn!(task_id = %task.id, message = %message, "task failed at backend");
            outcome
                .failures
                .extend(ChunkOutcome::all_failed(&chunk, FailureReason::BackendError, Some(&task.id)).failures);
        }
        Ok(TaskOutcome::TimedOut) => {
            outcome
                .failures
                .extend(ChunkOutcome::all_failed(&chunk, FailureReason::PollTimeout, Some(&task.id)).failures);
        }
        Err(PipelineError::Cancelled) => {
            outcome
                .failures
                .extend(ChunkOutcome::all_failed(&chunk, FailureReason::Cancelled, Some(&task.id)).failures);
        }
        Err(e) => {
            // Stage errors stop here; the run continues.
            warn!(task_id = %task.id, error = %e, "polling error");
            outcome
                .failures
                .extend(ChunkOutcome::all_failed(&chunk, FailureReason::BackendError, Some(&task.id)).failures);
        }
    }

    outcome
}

/// Process one document in sync mode: call → validate → persist.
#[allow(clippy::too_many_arguments)]
async fn process_sync_document<B, S, D>(
    index: usize,
    document: DocumentRef,
    backend: Arc<B>,
    store: Arc<S>,
    source: Arc<D>,
    config: PipelineConfig,
    checks: Vec<QualityCheck>,
    run_id: Uuid,
    cancel: CancellationToken,
) -> ChunkOutcome
where
    B: InferenceBackend,
    S: RecordStore,
    D: DocumentSource,
{
    let chunk = Chunk::single(index, document.clone());

    if cancel.is_cancelled() {
        return ChunkOutcome::all_failed(&chunk, FailureReason::Cancelled, None);
    }

    let record = match process_single_document(
        &document,
        &config.processing_prompt,
        config.submission_max_retries,
        &*backend,
        &*source,
    )
    .await
    {
        Ok(record) => record,
        Err(e) => {
            warn!(document = %document, error = %e, "sync processing failed");
            return ChunkOutcome::all_failed(&chunk, FailureReason::SubmissionFailed, None);
        }
    };

    let mut outcome = ChunkOutcome::default();
    outcome.stats.submitted = 1;
    outcome.stats.completed = 1;

    // Sync calls have no backend task lifecycle; mint a local identifier
    // so the persisted record still traces to this processing attempt.
    let task_id = Uuid::new_v4().to_string();
    let report = validate_task_result(&chunk, std::slice::from_ref(&record), &checks, &task_id);

    for record in report.valid {
        write_or_demote(&*store, run_id, record, &task_id, &mut outcome).await;
    }
    outcome.failures.extend(report.invalid);

    outcome
}

/// Attempt one durable write; on failure demote the document instead of
/// aborting the rest of the set.
async fn write_or_demote<S: RecordStore>(
    store: &S,
    run_id: Uuid,
    record: ValidatedRecord,
    task_id: &str,
    outcome: &mut ChunkOutcome,
) {
    match store.write_record(run_id, &record).await {
        Ok(()) => outcome.stats.validated += 1,
        Err(e) => {
            warn!(document = %record.document, error = %e, "write failed");
            outcome.failures.push(
                FailureRecord::new(record.document, FailureReason::WriteFailed)
                    .with_task_id(task_id),
            );
        }
    }
}
