//! Batch Document Extraction Pipeline
//!
//! Turns an ordered list of document paths into durable, schema-valid
//! extraction records by way of a remote AI inference backend: chunk,
//! submit, poll to completion, validate per document, persist idempotently,
//! and capture every failure into a retry-ready artifact.
//!
//! # Design Philosophy
//!
//! **"No document silently disappears"**
//!
//! - Every input ends as exactly one persisted record or one recorded failure
//! - Partial failure is isolated per document, never per batch
//! - Polling is a pure state machine; any scheduler can drive it
//! - The failure artifact is itself valid pipeline input (closed retry loop)
//!
//! # Usage
//!
//! ```rust,ignore
//! use docflow::{Pipeline, PipelineConfig, MemoryStore, FileSource};
//! use docflow::testing::MockBackend;
//!
//! let pipeline = Pipeline::new(
//!     MockBackend::new(),
//!     MemoryStore::new(),
//!     FileSource::new(),
//!     PipelineConfig::default().with_chunk_size(10),
//! )?;
//!
//! let report = pipeline.run(documents).await?;
//! println!("validated {} failed {}", report.stats.validated, report.stats.failed);
//!
//! // Failures feed the retry loop.
//! docflow::write_retry_file("failures.csv", &report.failures)?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (InferenceBackend, RecordStore, DocumentSource)
//! - [`types`] - Pipeline data types
//! - [`chunker`], [`submitter`], [`poller`], [`validator`], [`recorder`] - Pipeline stages
//! - [`coordinator`] - The pipeline coordinator
//! - [`stores`] - Storage implementations (MemoryStore, PostgresStore)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod backend;
pub mod chunker;
pub mod coordinator;
pub mod error;
pub mod poller;
pub mod recorder;
pub mod security;
pub mod stores;
pub mod submitter;
pub mod testing;
pub mod traits;
pub mod types;
pub mod validator;

// Re-export core types at crate root
pub use error::{PipelineError, Result};
pub use traits::{
    backend::InferenceBackend,
    source::{DocumentSource, FileSource},
    store::{RecordStore, StoredRecord},
};
pub use types::{
    config::{PipelineConfig, PollConfig, ProcessingMode},
    document::{Chunk, DocumentRef, SourceDocument},
    record::{ExtractedDocument, FailureReason, FailureRecord, ValidatedRecord},
    stats::{RunReport, RunStats},
    task::{BackendJobStatus, RawRecord, Task, TaskOutcome, TaskState, TokenUsage},
};

// Re-export the coordinator
pub use coordinator::Pipeline;

// Re-export pipeline stage entry points
pub use chunker::chunk_documents;
pub use poller::{poll_step, poll_until_terminal, PollPlan};
pub use recorder::{
    read_document_list, read_retry_file, write_retry_file, FailureLog, RetryEntry,
};
pub use submitter::{load_documents, process_single_document, submit_chunk};
pub use validator::{
    default_checks, parse_raw_output, validate_task_result, QualityCheck, ValidationReport,
};

// Re-export stores
pub use stores::MemoryStore;

#[cfg(feature = "postgres")]
pub use stores::PostgresStore;

// Re-export the Gemini backend
#[cfg(feature = "gemini")]
pub use backend::GeminiBackend;

// Re-export credentials
pub use security::{BackendCredentials, DatabaseCredentials};
