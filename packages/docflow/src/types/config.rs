//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// How documents reach the inference backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Chunked batch jobs, reconciled by polling
    Batch,

    /// One blocking call per document; no task lifecycle
    Sync,
}

impl Default for ProcessingMode {
    fn default() -> Self {
        Self::Batch
    }
}

/// Polling behavior for batch tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the second poll (the first happens immediately)
    pub initial_interval: Duration,

    /// Multiplier applied to the delay after each pending poll
    pub backoff_factor: f64,

    /// Upper bound on the delay between polls
    pub max_interval: Duration,

    /// Status queries allowed before a task is declared timed out
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_secs(5),
            backoff_factor: 2.0,
            max_interval: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}

impl PollConfig {
    /// Delay to wait after `completed_attempts` status queries have all
    /// reported pending. Grows by `backoff_factor` per attempt, capped at
    /// `max_interval`.
    pub fn delay_after_attempt(&self, completed_attempts: u32) -> Duration {
        let exponent = completed_attempts.saturating_sub(1).min(63);
        let scaled =
            self.initial_interval.as_secs_f64() * self.backoff_factor.powi(exponent as i32);
        let capped = scaled.min(self.max_interval.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Configuration for one pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Execution mode
    pub mode: ProcessingMode,

    /// Documents per chunk (batch mode only)
    pub chunk_size: usize,

    /// Polling behavior (batch mode only)
    pub poll: PollConfig,

    /// Submission attempts per chunk before its documents are failed
    pub submission_max_retries: u32,

    /// Total processing attempts allowed per document before it is
    /// permanently recorded as failed (explicit, never infinite)
    pub max_document_retries: u32,

    /// Instruction forwarded verbatim to the inference backend
    pub processing_prompt: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: ProcessingMode::Batch,
            chunk_size: 10,
            poll: PollConfig::default(),
            submission_max_retries: 3,
            max_document_retries: 3,
            processing_prompt: "Extract the document's title and main content. Respond with \
                                JSON: {\"title\": string, \"content\": string, \"metadata\": object}."
                .to_string(),
        }
    }
}

impl PipelineConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set polling behavior.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the submission retry budget.
    pub fn with_submission_max_retries(mut self, retries: u32) -> Self {
        self.submission_max_retries = retries;
        self
    }

    /// Set the per-document retry budget.
    pub fn with_max_document_retries(mut self, retries: u32) -> Self {
        self.max_document_retries = retries;
        self
    }

    /// Set the processing prompt.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.processing_prompt = prompt.into();
        self
    }

    /// Validate the configuration.
    ///
    /// This is the only check that aborts a run before any submission.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(PipelineError::invalid_config("chunk_size must be positive"));
        }
        if self.poll.max_attempts == 0 {
            return Err(PipelineError::invalid_config(
                "poll.max_attempts must be positive",
            ));
        }
        if self.poll.backoff_factor < 1.0 {
            return Err(PipelineError::invalid_config(
                "poll.backoff_factor must be >= 1.0",
            ));
        }
        if self.poll.initial_interval.is_zero() {
            return Err(PipelineError::invalid_config(
                "poll.initial_interval must be positive",
            ));
        }
        if self.submission_max_retries == 0 {
            return Err(PipelineError::invalid_config(
                "submission_max_retries must be positive",
            ));
        }
        if self.max_document_retries == 0 {
            return Err(PipelineError::invalid_config(
                "max_document_retries must be positive",
            ));
        }
        if self.processing_prompt.trim().is_empty() {
            return Err(PipelineError::invalid_config(
                "processing_prompt must not be empty",
            ));
        }
        Ok(())
    }
}
