//! Tasks: handles to outstanding remote inference work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::document::{Chunk, DocumentRef};

/// Lifecycle state of a remote task.
///
/// `Submitted → Pending → {Completed, Failed, TimedOut}`. The last three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Acknowledged by the backend, not yet polled
    Submitted,

    /// Backend still working; another poll is scheduled
    Pending,

    /// Backend finished and results were fetched
    Completed,

    /// Backend reported a terminal error
    Failed,

    /// Poll attempts exhausted while still pending
    TimedOut,
}

impl TaskState {
    /// Whether no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Status reported by the backend for one status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendJobStatus {
    /// Accepted but not started
    Queued,

    /// In progress
    Running,

    /// Finished successfully; results available
    Done,

    /// Terminal backend failure with a reason
    Error(String),
}

/// Terminal outcome of a task, cached on the task for idempotent re-polls.
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    /// Result payload, one raw record per returned document
    Completed(Vec<RawRecord>),

    /// Backend failure reason
    Failed(String),

    /// Poll budget exhausted
    TimedOut,
}

/// A handle to one outstanding unit of remote work.
///
/// Owned exclusively by the poller from submission until terminal state;
/// only the coordinator may discard it.
#[derive(Debug, Clone)]
pub struct Task {
    /// Opaque backend-issued identifier
    pub id: String,

    /// The originating chunk
    pub chunk: Chunk,

    /// When the task was submitted
    pub submitted_at: DateTime<Utc>,

    /// Current lifecycle state
    pub state: TaskState,

    /// Number of status queries performed so far
    pub poll_attempts: u32,

    outcome: Option<TaskOutcome>,
}

impl Task {
    /// Create a freshly submitted task.
    pub fn new(id: impl Into<String>, chunk: Chunk) -> Self {
        Self {
            id: id.into(),
            chunk,
            submitted_at: Utc::now(),
            state: TaskState::Submitted,
            poll_attempts: 0,
            outcome: None,
        }
    }

    /// The cached terminal outcome, if the task has reached one.
    pub fn outcome(&self) -> Option<&TaskOutcome> {
        self.outcome.as_ref()
    }

    /// Transition to `Completed` with the fetched results.
    pub(crate) fn complete(&mut self, records: Vec<RawRecord>) {
        self.state = TaskState::Completed;
        self.outcome = Some(TaskOutcome::Completed(records));
    }

    /// Transition to `Failed` with the backend's reason.
    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.state = TaskState::Failed;
        self.outcome = Some(TaskOutcome::Failed(message.into()));
    }

    /// Transition to `TimedOut`.
    pub(crate) fn time_out(&mut self) {
        self.state = TaskState::TimedOut;
        self.outcome = Some(TaskOutcome::TimedOut);
    }
}

/// One backend response entry: the raw model output for one document.
///
/// Immutable once retrieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    /// The document this output belongs to
    pub document: DocumentRef,

    /// Raw model output text (expected to be JSON, but not guaranteed)
    pub content: String,

    /// Model version that produced the output
    #[serde(default)]
    pub model_version: Option<String>,

    /// Token accounting for the request
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl RawRecord {
    /// Create a raw record.
    pub fn new(document: impl Into<DocumentRef>, content: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            content: content.into(),
            model_version: None,
            usage: None,
        }
    }

    /// Set the model version.
    pub fn with_model_version(mut self, version: impl Into<String>) -> Self {
        self.model_version = Some(version.into());
        self
    }

    /// Set token usage.
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Token usage reported by the backend for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,

    /// Total tokens billed
    pub total_tokens: u32,
}
