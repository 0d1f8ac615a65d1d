//! Validated records and failure records.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::document::DocumentRef;

/// The structured payload the model is expected to return per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    /// Document title
    pub title: String,

    /// Main extracted content
    pub content: String,

    /// Free-form metadata (model version, token usage, source hints)
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ExtractedDocument {
    /// Create an extracted document with empty metadata.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A task result entry that passed schema and quality checks.
///
/// Ready for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedRecord {
    /// The document this record was extracted from
    pub document: DocumentRef,

    /// Identifier of the task that produced it
    pub task_id: String,

    /// The structured payload
    pub data: ExtractedDocument,

    /// When validation passed
    pub validated_at: DateTime<Utc>,
}

impl ValidatedRecord {
    /// Create a validated record stamped now.
    pub fn new(
        document: impl Into<DocumentRef>,
        task_id: impl Into<String>,
        data: ExtractedDocument,
    ) -> Self {
        Self {
            document: document.into(),
            task_id: task_id.into(),
            data,
            validated_at: Utc::now(),
        }
    }
}

/// Why a document failed, serialized snake_case into the retry artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Chunk submission exhausted its retry budget
    SubmissionFailed,

    /// Poll attempts exhausted while the task was pending
    PollTimeout,

    /// Backend reported a terminal task error
    BackendError,

    /// Model output did not parse into the expected shape
    SchemaInvalid,

    /// Required title field missing or empty
    MissingTitle,

    /// Required content field missing or empty
    MissingContent,

    /// Content shorter than the configured minimum
    ContentTooShort,

    /// Content was a known placeholder value
    PlaceholderContent,

    /// Backend dropped the document from its result set
    MissingResult,

    /// Durable write failed for this record
    WriteFailed,

    /// Run was cancelled before this document was submitted
    Cancelled,
}

impl FailureReason {
    /// Wire string for the retry artifact.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmissionFailed => "submission_failed",
            Self::PollTimeout => "poll_timeout",
            Self::BackendError => "backend_error",
            Self::SchemaInvalid => "schema_invalid",
            Self::MissingTitle => "missing_title",
            Self::MissingContent => "missing_content",
            Self::ContentTooShort => "content_too_short",
            Self::PlaceholderContent => "placeholder_content",
            Self::MissingResult => "missing_result",
            Self::WriteFailed => "write_failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the coordinator may resubmit the document within the run.
    ///
    /// Cancelled documents are excluded: resubmitting them would defeat the
    /// cancellation. Everything else (including validation failures, where
    /// model output varies between attempts) is eligible.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailureReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "submission_failed" => Ok(Self::SubmissionFailed),
            "poll_timeout" => Ok(Self::PollTimeout),
            "backend_error" => Ok(Self::BackendError),
            "schema_invalid" => Ok(Self::SchemaInvalid),
            "missing_title" => Ok(Self::MissingTitle),
            "missing_content" => Ok(Self::MissingContent),
            "content_too_short" => Ok(Self::ContentTooShort),
            "placeholder_content" => Ok(Self::PlaceholderContent),
            "missing_result" => Ok(Self::MissingResult),
            "write_failed" => Ok(Self::WriteFailed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown failure reason: {other}")),
        }
    }
}

/// A document's terminal failure outcome.
///
/// Feeds the retry loop via the retry artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    /// The failed document
    pub document: DocumentRef,

    /// Reason code
    pub reason: FailureReason,

    /// Identifier of the originating task, if one was created
    pub task_id: Option<String>,

    /// When the failure was recorded
    pub failed_at: DateTime<Utc>,

    /// Processing attempts this document has consumed across the run
    /// (carried in the retry artifact so the budget survives re-ingestion)
    pub attempts: u32,
}

impl FailureRecord {
    /// Create a failure record stamped now, with one attempt consumed.
    pub fn new(document: impl Into<DocumentRef>, reason: FailureReason) -> Self {
        Self {
            document: document.into(),
            reason,
            task_id: None,
            failed_at: Utc::now(),
            attempts: 1,
        }
    }

    /// Set the originating task identifier.
    pub fn with_task_id(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Set the consumed-attempts counter.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }
}
