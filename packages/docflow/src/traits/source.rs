//! Document source trait for pluggable content loading.

use async_trait::async_trait;

use crate::error::{PipelineError, Result};
use crate::types::document::DocumentRef;

/// Loads a document reference's text content.
///
/// The shipped [`FileSource`] reads UTF-8 text from the local filesystem;
/// other formats (PDF, DOCX, object storage) plug in at this seam.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Load the content behind a document reference.
    async fn load(&self, document: &DocumentRef) -> Result<String>;
}

/// Filesystem-backed document source.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl FileSource {
    /// Create a filesystem source.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentSource for FileSource {
    async fn load(&self, document: &DocumentRef) -> Result<String> {
        tokio::fs::read_to_string(document.as_str())
            .await
            .map_err(|e| PipelineError::Source {
                document: document.to_string(),
                message: e.to_string(),
            })
    }
}
