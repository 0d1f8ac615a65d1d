//! Gemini API request and response types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Content generation
// =============================================================================

/// A single content part (text only; the pipeline never sends media).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Text payload
    pub text: String,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// A content block: role plus parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Role: "user" or "model"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Content parts
    pub parts: Vec<Part>,
}

impl Content {
    /// Create a user content block with a single text part.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part::text(text)],
        }
    }
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    /// Conversation contents
    pub contents: Vec<Content>,
}

impl GenerateContentRequest {
    /// Create a request from a single user prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
        }
    }
}

/// Response from `models/{model}:generateContent`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    /// Response candidates (usually one)
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    /// Model version that produced the response
    #[serde(default)]
    pub model_version: Option<String>,

    /// Token usage statistics
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// Extract the first candidate's text, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
    }
}

/// One response candidate.
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    /// Generated content
    pub content: Content,
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    /// Tokens in the prompt
    #[serde(default)]
    pub prompt_token_count: u32,

    /// Tokens in the candidates
    #[serde(default)]
    pub candidates_token_count: u32,

    /// Total tokens
    #[serde(default)]
    pub total_token_count: u32,

    /// Tokens served from cache
    #[serde(default)]
    pub cached_content_token_count: u32,
}

// =============================================================================
// Batch mode
// =============================================================================

/// One request within a batch, with caller-supplied correlation metadata.
///
/// The `metadata` map is echoed back verbatim on the matching
/// [`InlinedResponse`], which is how callers correlate responses to their
/// originating inputs without relying on ordering.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRequestItem {
    /// The generation request
    pub request: GenerateContentRequest,

    /// Correlation metadata echoed on the response
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl BatchRequestItem {
    /// Create a batch item from a prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            request: GenerateContentRequest::from_prompt(prompt),
            metadata: HashMap::new(),
        }
    }

    /// Attach a correlation key (echoed back on the response).
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.metadata.insert("key".to_string(), key.into());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateBatchRequest {
    pub batch: BatchConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchConfig {
    pub display_name: String,
    pub input_config: BatchInputConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchInputConfig {
    pub requests: BatchInlineRequests,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchInlineRequests {
    pub requests: Vec<BatchRequestItem>,
}

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum JobState {
    #[serde(rename = "JOB_STATE_UNSPECIFIED")]
    Unspecified,
    #[serde(rename = "JOB_STATE_PENDING")]
    Pending,
    #[serde(rename = "JOB_STATE_RUNNING")]
    Running,
    #[serde(rename = "JOB_STATE_SUCCEEDED")]
    Succeeded,
    #[serde(rename = "JOB_STATE_FAILED")]
    Failed,
    #[serde(rename = "JOB_STATE_CANCELLING")]
    Cancelling,
    #[serde(rename = "JOB_STATE_CANCELLED")]
    Cancelled,
}

impl Default for JobState {
    fn default() -> Self {
        Self::Unspecified
    }
}

impl JobState {
    /// Whether the job can make no further progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

/// A batch job as reported by `GET {batch name}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    /// Server-assigned resource name (e.g. "batches/abc123")
    pub name: String,

    /// Job metadata including lifecycle state
    #[serde(default)]
    pub metadata: BatchMetadata,

    /// Final response once the job succeeds
    #[serde(default)]
    pub response: Option<BatchResponse>,

    /// Terminal error once the job fails
    #[serde(default)]
    pub error: Option<StatusError>,
}

impl BatchJob {
    /// Current lifecycle state.
    pub fn state(&self) -> JobState {
        self.metadata.state
    }

    /// Inlined responses, empty until the job succeeds.
    pub fn inlined_responses(&self) -> &[InlinedResponse] {
        self.response
            .as_ref()
            .map(|r| r.inlined_responses.as_slice())
            .unwrap_or_default()
    }
}

/// Metadata envelope on a batch job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    /// Lifecycle state
    #[serde(default)]
    pub state: JobState,
}

/// Response envelope on a succeeded batch job.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// One entry per batch request
    #[serde(default)]
    pub inlined_responses: Vec<InlinedResponse>,
}

/// One per-request result within a succeeded batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlinedResponse {
    /// The generation result, absent if this request errored
    #[serde(default)]
    pub response: Option<GenerateContentResponse>,

    /// Per-request error, absent on success
    #[serde(default)]
    pub error: Option<StatusError>,

    /// Correlation metadata echoed from the request
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InlinedResponse {
    /// The correlation key attached at submission, if any.
    pub fn key(&self) -> Option<&str> {
        self.metadata.get("key").map(String::as_str)
    }
}

/// A google.rpc.Status error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusError {
    /// Numeric status code
    #[serde(default)]
    pub code: i32,

    /// Human-readable message
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_state_parses_wire_names() {
        let state: JobState = serde_json::from_str("\"JOB_STATE_SUCCEEDED\"").unwrap();
        assert_eq!(state, JobState::Succeeded);
        assert!(state.is_terminal());

        let state: JobState = serde_json::from_str("\"JOB_STATE_RUNNING\"").unwrap();
        assert_eq!(state, JobState::Running);
        assert!(!state.is_terminal());
    }

    #[test]
    fn test_batch_job_deserializes() {
        let json = r#"{
            "name": "batches/abc123",
            "metadata": {"state": "JOB_STATE_SUCCEEDED"},
            "response": {
                "inlinedResponses": [
                    {
                        "response": {
                            "candidates": [{"content": {"parts": [{"text": "hello"}]}}],
                            "usageMetadata": {"promptTokenCount": 10, "totalTokenCount": 15}
                        },
                        "metadata": {"key": "docs/a.txt"}
                    }
                ]
            }
        }"#;

        let job: BatchJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.name, "batches/abc123");
        assert_eq!(job.state(), JobState::Succeeded);

        let responses = job.inlined_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].key(), Some("docs/a.txt"));
        assert_eq!(
            responses[0].response.as_ref().unwrap().first_text(),
            Some("hello")
        );
    }

    #[test]
    fn test_batch_job_pending_has_no_responses() {
        let json = r#"{"name": "batches/x", "metadata": {"state": "JOB_STATE_PENDING"}}"#;
        let job: BatchJob = serde_json::from_str(json).unwrap();
        assert_eq!(job.state(), JobState::Pending);
        assert!(job.inlined_responses().is_empty());
    }

    #[test]
    fn test_first_text_empty_candidates() {
        let json = r#"{"candidates": []}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text(), None);
    }
}
