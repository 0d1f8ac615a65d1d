//! Pure Gemini REST API client
//!
//! A clean, minimal client for the Gemini API with no domain-specific logic.
//! Supports synchronous content generation and asynchronous Batch Mode
//! (create a job, poll its state, read inlined responses).
//!
//! # Example
//!
//! ```rust,ignore
//! use gemini_client::{GeminiClient, GenerateContentRequest, BatchRequestItem};
//!
//! let client = GeminiClient::from_env()?;
//!
//! // Synchronous generation
//! let response = client
//!     .generate_content(GenerateContentRequest::from_prompt("Hello!"))
//!     .await?;
//!
//! // Batch mode: submit, then poll
//! let items = vec![BatchRequestItem::from_prompt("Summarize A").with_key("a")];
//! let job_name = client.create_batch(items, "nightly-run").await?;
//! let job = client.get_batch(&job_name).await?;
//! ```

pub mod error;
pub mod types;

pub use error::{GeminiError, Result};
pub use types::*;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Default Gemini API base URL.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default model for content generation.
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Pure Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    /// Create a new Gemini client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Create from environment variable `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| GeminiError::Config("GEMINI_API_KEY not set".into()))?;
        Ok(Self::new(api_key))
    }

    /// Set a custom base URL (for proxies or regional endpoints).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the model (default: gemini-2.5-flash).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate content synchronously (`models/{model}:generateContent`).
    ///
    /// The call blocks until the model returns a result; there is no job
    /// lifecycle to track.
    pub async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        self.post(&url, &request).await
    }

    /// Create a batch job (`models/{model}:batchGenerateContent`).
    ///
    /// Fire-and-forget: the server acknowledges the job and processes it
    /// asynchronously. Returns the job's resource name for polling with
    /// [`get_batch`](Self::get_batch).
    pub async fn create_batch(
        &self,
        items: Vec<BatchRequestItem>,
        display_name: impl Into<String>,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:batchGenerateContent",
            self.base_url, self.model
        );

        let request = types::CreateBatchRequest {
            batch: types::BatchConfig {
                display_name: display_name.into(),
                input_config: types::BatchInputConfig {
                    requests: types::BatchInlineRequests { requests: items },
                },
            },
        };

        let job: BatchJob = self.post(&url, &request).await?;
        debug!(job = %job.name, "created batch job");
        Ok(job.name)
    }

    /// Fetch a batch job's current state and (once succeeded) its results.
    ///
    /// Safe to call repeatedly; a terminal job keeps returning the same
    /// payload.
    pub async fn get_batch(&self, name: &str) -> Result<BatchJob> {
        let url = format!("{}/{}", self.base_url, name);
        self.get(&url).await
    }

    async fn post<T: Serialize, R: DeserializeOwned>(&self, url: &str, body: &T) -> Result<R> {
        let response = self
            .http_client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn get<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        let response = self
            .http_client
            .get(url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GeminiError::Network(e.to_string()))?;

        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api(format!("{}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| GeminiError::Parse(e.to_string()))
    }
}
