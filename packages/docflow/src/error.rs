//! Typed errors for the document pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.

use thiserror::Error;

/// Errors that can occur during pipeline operations.
///
/// Only [`PipelineError::InvalidConfiguration`] aborts a run; every other
/// variant is caught at the coordinator boundary and demoted to a
/// [`FailureRecord`](crate::types::record::FailureRecord).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration rejected before any submission
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// Submission to the inference backend failed
    #[error("submission failed: {0}")]
    Submission(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Backend reported a terminal error for a task
    #[error("backend error for task {task_id}: {message}")]
    Backend { task_id: String, message: String },

    /// Poll attempts exhausted while the task was still pending
    #[error("task {task_id} timed out after {attempts} poll attempts")]
    PollTimeout { task_id: String, attempts: u32 },

    /// Durable write failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Document source could not be read
    #[error("source error for {document}: {message}")]
    Source { document: String, message: String },

    /// Backend dropped a document from its result set
    #[error("no result returned for document: {document}")]
    MissingResult { document: String },

    /// Run was cancelled
    #[error("operation cancelled")]
    Cancelled,

    /// Retry artifact I/O failed
    #[error("retry artifact error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON payload (de)serialization failed
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Shorthand for a configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
