//! Gemini implementation of the inference backend trait.
//!
//! A reference implementation over the `gemini-client` package: batch mode
//! maps to Gemini Batch Mode jobs, sync mode to `generateContent`.
//!
//! # Example
//!
//! ```rust,ignore
//! use docflow::backend::GeminiBackend;
//! use docflow::security::BackendCredentials;
//!
//! let creds = BackendCredentials::new(api_key, "gemini-2.5-flash");
//! let backend = GeminiBackend::new(creds);
//! let pipeline = Pipeline::new(backend, store, source, config)?;
//! ```

use async_trait::async_trait;
use gemini_client::{
    BatchRequestItem, GeminiClient, GenerateContentRequest, JobState, UsageMetadata,
};
use tracing::warn;

use crate::error::{PipelineError, Result};
use crate::security::BackendCredentials;
use crate::traits::backend::InferenceBackend;
use crate::types::document::{DocumentRef, SourceDocument};
use crate::types::task::{BackendJobStatus, RawRecord, TokenUsage};

/// Gemini-backed inference backend.
pub struct GeminiBackend {
    client: GeminiClient,
}

impl GeminiBackend {
    /// Create a backend from injected credentials.
    pub fn new(credentials: BackendCredentials) -> Self {
        let client = GeminiClient::new(credentials.api_key.expose())
            .with_model(credentials.model.clone());
        Self { client }
    }

    /// Create a backend from an existing client (for custom base URLs).
    pub fn from_client(client: GeminiClient) -> Self {
        Self { client }
    }

    fn build_prompt(prompt: &str, document: &SourceDocument) -> String {
        format!("{}\n\nDocument content:\n{}", prompt, document.content)
    }

    fn map_state(state: JobState) -> BackendJobStatus {
        match state {
            JobState::Pending | JobState::Unspecified => BackendJobStatus::Queued,
            JobState::Running | JobState::Cancelling => BackendJobStatus::Running,
            JobState::Succeeded => BackendJobStatus::Done,
            JobState::Failed => BackendJobStatus::Error("batch job failed".to_string()),
            JobState::Cancelled => BackendJobStatus::Error("batch job cancelled".to_string()),
        }
    }

    fn map_usage(usage: &UsageMetadata) -> TokenUsage {
        TokenUsage {
            prompt_tokens: usage.prompt_token_count,
            completion_tokens: usage.candidates_token_count,
            total_tokens: usage.total_token_count,
        }
    }
}

#[async_trait]
impl InferenceBackend for GeminiBackend {
    async fn submit_batch(&self, documents: &[SourceDocument], prompt: &str) -> Result<String> {
        let items: Vec<BatchRequestItem> = documents
            .iter()
            .map(|doc| {
                BatchRequestItem::from_prompt(Self::build_prompt(prompt, doc))
                    .with_key(doc.document.as_str())
            })
            .collect();

        let display_name = format!("docflow_batch_{}", documents.len());
        self.client
            .create_batch(items, display_name)
            .await
            .map_err(|e| PipelineError::Submission(Box::new(e)))
    }

    async fn poll_task(&self, task_id: &str) -> Result<BackendJobStatus> {
        let job = self
            .client
            .get_batch(task_id)
            .await
            .map_err(|e| PipelineError::Backend {
                task_id: task_id.to_string(),
                message: e.to_string(),
            })?;

        if let Some(error) = &job.error {
            return Ok(BackendJobStatus::Error(error.message.clone()));
        }
        Ok(Self::map_state(job.state()))
    }

    async fn fetch_results(&self, task_id: &str) -> Result<Vec<RawRecord>> {
        let job = self
            .client
            .get_batch(task_id)
            .await
            .map_err(|e| PipelineError::Backend {
                task_id: task_id.to_string(),
                message: e.to_string(),
            })?;

        let mut records = Vec::new();
        for inlined in job.inlined_responses() {
            // The correlation key is set at submission; entries without one
            // cannot be mapped back and are skipped (the validator surfaces
            // the document as missing).
            let Some(key) = inlined.key() else {
                warn!(task_id, "batch response entry has no correlation key");
                continue;
            };
            let document = DocumentRef::new(key);

            let Some(response) = &inlined.response else {
                let message = inlined
                    .error
                    .as_ref()
                    .map(|e| e.message.clone())
                    .unwrap_or_else(|| "no response".to_string());
                warn!(task_id, document = %document, message = %message, "per-request error");
                continue;
            };

            let Some(text) = response.first_text() else {
                warn!(task_id, document = %document, "response has no candidates");
                continue;
            };

            let mut record = RawRecord::new(document, text);
            if let Some(version) = &response.model_version {
                record = record.with_model_version(version.clone());
            }
            if let Some(usage) = &response.usage_metadata {
                record = record.with_usage(Self::map_usage(usage));
            }
            records.push(record);
        }

        Ok(records)
    }

    async fn process_single(&self, document: &SourceDocument, prompt: &str) -> Result<RawRecord> {
        let request = GenerateContentRequest::from_prompt(Self::build_prompt(prompt, document));

        let response = self
            .client
            .generate_content(request)
            .await
            .map_err(|e| PipelineError::Submission(Box::new(e)))?;

        let text = response
            .first_text()
            .ok_or_else(|| PipelineError::MissingResult {
                document: document.document.to_string(),
            })?;

        let mut record = RawRecord::new(document.document.clone(), text);
        if let Some(version) = &response.model_version {
            record = record.with_model_version(version.clone());
        }
        if let Some(usage) = &response.usage_metadata {
            record = record.with_usage(Self::map_usage(usage));
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_mapping() {
        assert_eq!(
            GeminiBackend::map_state(JobState::Pending),
            BackendJobStatus::Queued
        );
        assert_eq!(
            GeminiBackend::map_state(JobState::Running),
            BackendJobStatus::Running
        );
        assert_eq!(
            GeminiBackend::map_state(JobState::Succeeded),
            BackendJobStatus::Done
        );
        assert!(matches!(
            GeminiBackend::map_state(JobState::Failed),
            BackendJobStatus::Error(_)
        ));
        assert!(matches!(
            GeminiBackend::map_state(JobState::Cancelled),
            BackendJobStatus::Error(_)
        ));
    }

    #[test]
    fn test_prompt_includes_document_content() {
        let doc = SourceDocument::new("a.txt", "the body");
        let prompt = GeminiBackend::build_prompt("Extract fields.", &doc);
        assert!(prompt.starts_with("Extract fields."));
        assert!(prompt.contains("Document content:\nthe body"));
    }
}
