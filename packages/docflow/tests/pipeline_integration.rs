//! Integration tests for the full pipeline.
//!
//! These tests drive the coordinator end to end over mock collaborators:
//! 1. Chunk an input list
//! 2. Submit and poll batch tasks
//! 3. Validate per-document results
//! 4. Persist records / record failures
//! 5. Feed the retry artifact back in

use std::sync::Arc;

use docflow::testing::{BackendCall, FlakyStore, MockBackend, MockSource};
use docflow::{
    read_retry_file, write_retry_file, BackendJobStatus, DocumentRef, FailureReason,
    FailureRecord, MemoryStore, Pipeline, PipelineConfig, PollConfig, ProcessingMode,
    QualityCheck, RecordStore,
};

/// Helper to build an input list of synthetic document paths.
fn documents(n: usize) -> Vec<DocumentRef> {
    (0..n)
        .map(|i| DocumentRef::new(format!("docs/file_{i:03}.txt")))
        .collect()
}

fn batch_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_chunk_size(10)
        .with_max_document_retries(1)
}

/// Helper to wire a pipeline over shared mocks, so tests can inspect the
/// backend and store after the run.
fn pipeline(
    backend: &Arc<MockBackend>,
    store: &Arc<MemoryStore>,
    config: PipelineConfig,
) -> Pipeline<Arc<MockBackend>, Arc<MemoryStore>, MockSource> {
    Pipeline::new(
        Arc::clone(backend),
        Arc::clone(store),
        MockSource::new().with_default_content(),
        config,
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_happy_path_25_documents() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());
    let run_id = pipeline.run_id();

    let report = pipeline.run(documents(25)).await.unwrap();

    assert_eq!(report.stats.submitted, 25);
    assert_eq!(report.stats.completed, 25);
    assert_eq!(report.stats.validated, 25);
    assert_eq!(report.stats.failed, 0);
    assert!(report.is_complete_success());
    assert_eq!(store.count_records(run_id).await.unwrap(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_submit_call_sizes_match_chunking() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());

    pipeline.run(documents(25)).await.unwrap();

    let mut sizes: Vec<usize> = backend
        .calls()
        .iter()
        .filter_map(|c| match c {
            BackendCall::SubmitBatch { documents, .. } => Some(*documents),
            _ => None,
        })
        .collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 10, 10]);

    // Batch mode never touches the sync endpoint.
    assert!(!backend
        .calls()
        .iter()
        .any(|c| matches!(c, BackendCall::ProcessSingle { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_every_document_terminates_exactly_once() {
    // Mixed outcomes: one dropped by the backend, one invalid payload.
    let backend = Arc::new(
        MockBackend::new()
            .with_dropped_document("docs/file_003.txt")
            .with_payload(
                "docs/file_007.txt",
                serde_json::json!({"title": "", "content": "long enough body text"}).to_string(),
            ),
    );
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());

    let input = documents(25);
    let report = pipeline.run(input.clone()).await.unwrap();

    // validated + failed = N: nothing lost, nothing duplicated.
    assert_eq!(report.stats.validated + report.stats.failed, input.len());
    assert_eq!(report.failures.len(), 2);

    let failed_docs: Vec<_> = report
        .failures
        .iter()
        .map(|f| f.document.as_str())
        .collect();
    assert!(failed_docs.contains(&"docs/file_003.txt"));
    assert!(failed_docs.contains(&"docs/file_007.txt"));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_document_reason_is_missing_result() {
    let backend = Arc::new(MockBackend::new().with_dropped_document("docs/file_004.txt"));
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());

    let report = pipeline.run(documents(10)).await.unwrap();

    assert_eq!(report.stats.validated, 9);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].document.as_str(), "docs/file_004.txt");
    assert_eq!(report.failures[0].reason, FailureReason::MissingResult);
    assert!(report.failures[0].task_id.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_submission_succeeds_on_third_attempt() {
    let backend = Arc::new(MockBackend::new().with_failing_submissions(2));
    let store = Arc::new(MemoryStore::new());
    let config = batch_config().with_submission_max_retries(3);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(5)).await.unwrap();

    assert_eq!(report.stats.validated, 5);
    assert!(report.is_complete_success());
}

#[tokio::test(start_paused = true)]
async fn test_submission_exhaustion_fails_whole_chunk() {
    let backend = Arc::new(MockBackend::new().with_failing_submissions(99));
    let store = Arc::new(MemoryStore::new());
    let config = batch_config().with_submission_max_retries(3);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(5)).await.unwrap();

    assert_eq!(report.stats.validated, 0);
    assert_eq!(report.stats.failed, 5);
    assert!(report
        .failures
        .iter()
        .all(|f| f.reason == FailureReason::SubmissionFailed));
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_fails_chunk_documents() {
    let backend = Arc::new(MockBackend::new().with_never_finishing_tasks());
    let store = Arc::new(MemoryStore::new());
    let config = batch_config().with_poll(PollConfig {
        max_attempts: 3,
        ..Default::default()
    });
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(4)).await.unwrap();

    assert_eq!(report.stats.failed, 4);
    assert!(report
        .failures
        .iter()
        .all(|f| f.reason == FailureReason::PollTimeout));
    // Exactly max_attempts status queries for the single chunk's task.
    assert_eq!(
        backend
            .calls()
            .iter()
            .filter(|c| matches!(c, BackendCall::PollTask { .. }))
            .count(),
        3
    );
}

#[tokio::test(start_paused = true)]
async fn test_backend_error_fails_chunk_documents() {
    let backend = Arc::new(
        MockBackend::new()
            .with_status_script(vec![BackendJobStatus::Error("internal error".into())]),
    );
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());

    let report = pipeline.run(documents(3)).await.unwrap();

    assert_eq!(report.stats.failed, 3);
    assert!(report
        .failures
        .iter()
        .all(|f| f.reason == FailureReason::BackendError));
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_does_not_block_siblings() {
    let backend = MockBackend::new();
    let store = FlakyStore::new().with_failing_document("docs/file_002.txt");
    let source = MockSource::new().with_default_content();
    let pipeline = Pipeline::new(backend, store, source, batch_config()).unwrap();

    let report = pipeline.run(documents(5)).await.unwrap();

    assert_eq!(report.stats.validated, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].reason, FailureReason::WriteFailed);
    assert_eq!(report.failures[0].document.as_str(), "docs/file_002.txt");
}

#[tokio::test(start_paused = true)]
async fn test_retry_round_recovers_transient_failures() {
    // Submissions fail long enough to burn the first round's budget, then
    // recover; the documents succeed on the second round.
    let backend = Arc::new(MockBackend::new().with_failing_submissions(3));
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default()
        .with_chunk_size(10)
        .with_submission_max_retries(3)
        .with_max_document_retries(2);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(5)).await.unwrap();

    assert_eq!(report.stats.validated, 5);
    assert_eq!(report.stats.retried, 5);
    assert!(report.is_complete_success());
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_is_bounded() {
    // This document is dropped from every result set, so it fails every
    // round until its budget is exhausted.
    let backend = Arc::new(MockBackend::new().with_dropped_document("docs/file_001.txt"));
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default()
        .with_chunk_size(10)
        .with_max_document_retries(3);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(3)).await.unwrap();

    assert_eq!(report.stats.validated, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.retried, 2);
    assert_eq!(report.failures[0].attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_artifact_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failures.csv");

    // First run: one document permanently dropped.
    let backend = Arc::new(MockBackend::new().with_dropped_document("docs/file_001.txt"));
    let store = Arc::new(MemoryStore::new());
    let first = pipeline(&backend, &store, batch_config());
    let report = first.run(documents(3)).await.unwrap();
    assert_eq!(report.failures.len(), 1);

    write_retry_file(&path, &report.failures).unwrap();

    // Second run consumes the artifact; the backend behaves this time.
    let entries = read_retry_file(&path).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].document.as_str(), "docs/file_001.txt");
    assert_eq!(entries[0].attempts, 1);

    let backend = Arc::new(MockBackend::new());
    let second = pipeline(&backend, &store, batch_config());
    let report = second.resume(entries).await.unwrap();

    assert_eq!(report.stats.validated, 1);
    assert!(report.is_complete_success());
}

#[tokio::test(start_paused = true)]
async fn test_resume_honors_consumed_attempts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("failures.csv");
    let record = FailureRecord::new("docs/file_000.txt", FailureReason::MissingResult)
        .with_attempts(2);
    write_retry_file(&path, &[record]).unwrap();

    // The artifact says 2 attempts are already consumed; with a budget of 3
    // and a still-failing backend, only one more round runs.
    let backend = Arc::new(MockBackend::new().with_dropped_document("docs/file_000.txt"));
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default()
        .with_chunk_size(10)
        .with_max_document_retries(3);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.resume(read_retry_file(&path).unwrap()).await.unwrap();

    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.retried, 0);
    assert_eq!(report.failures[0].attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_sync_mode_never_polls() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default()
        .with_mode(ProcessingMode::Sync)
        .with_max_document_retries(1);
    let pipeline = pipeline(&backend, &store, config);
    let run_id = pipeline.run_id();

    let report = pipeline.run(documents(5)).await.unwrap();

    assert_eq!(report.stats.validated, 5);
    assert!(report.is_complete_success());
    assert_eq!(store.count_records(run_id).await.unwrap(), 5);

    // Sync mode goes through the one-shot endpoint only.
    let calls = backend.calls();
    assert!(!calls.iter().any(|c| matches!(c, BackendCall::PollTask { .. })));
    assert!(!calls.iter().any(|c| matches!(c, BackendCall::SubmitBatch { .. })));
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, BackendCall::ProcessSingle { .. }))
            .count(),
        5
    );
}

#[tokio::test(start_paused = true)]
async fn test_sync_call_retries_within_budget() {
    let backend = Arc::new(MockBackend::new().with_failing_single_calls(2));
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default()
        .with_mode(ProcessingMode::Sync)
        .with_submission_max_retries(3)
        .with_max_document_retries(1);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(1)).await.unwrap();

    assert_eq!(report.stats.validated, 1);
    assert!(report.is_complete_success());
}

#[tokio::test(start_paused = true)]
async fn test_sync_mode_isolates_failures() {
    let backend = Arc::new(MockBackend::new().with_payload("docs/file_001.txt", "short"));
    let store = Arc::new(MemoryStore::new());
    let config = PipelineConfig::default()
        .with_mode(ProcessingMode::Sync)
        .with_max_document_retries(1);
    let pipeline = pipeline(&backend, &store, config);

    let report = pipeline.run(documents(3)).await.unwrap();

    assert_eq!(report.stats.validated, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.failures[0].reason, FailureReason::ContentTooShort);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_before_run_records_all_documents() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());
    pipeline.cancel();

    let report = pipeline.run(documents(12)).await.unwrap();

    assert_eq!(report.stats.submitted, 0);
    assert_eq!(report.stats.failed, 12);
    assert!(report
        .failures
        .iter()
        .all(|f| f.reason == FailureReason::Cancelled));
    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_input_is_invalid_configuration() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());

    let err = pipeline.run(vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        docflow::PipelineError::InvalidConfiguration { .. }
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_check_set_relaxes_validation() {
    let backend = Arc::new(MockBackend::new().with_payload(
        "docs/file_001.txt",
        serde_json::json!({"title": "Memo", "content": "short"}).to_string(),
    ));
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        Arc::clone(&backend),
        Arc::clone(&store),
        MockSource::new().with_default_content(),
        batch_config(),
    )
    .unwrap()
    .with_checks(vec![QualityCheck::RequiredFields]);

    let report = pipeline.run(documents(2)).await.unwrap();

    // Without the length check the short record passes.
    assert_eq!(report.stats.validated, 2);
    assert!(report.is_complete_success());
}

#[tokio::test(start_paused = true)]
async fn test_persisted_record_readable_by_run_and_document() {
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new());
    let pipeline = pipeline(&backend, &store, batch_config());
    let run_id = pipeline.run_id();

    pipeline.run(documents(7)).await.unwrap();

    let stored = store
        .get_record(run_id, &DocumentRef::new("docs/file_004.txt"))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.data.title.contains("file_004"));
    assert!(!stored.task_id.is_empty());
}
