//! Document references and chunks.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one input document (a file path or content locator).
///
/// Immutable once created. Unique within a run; retries may reintroduce the
/// same path in a later run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentRef(String);

impl DocumentRef {
    /// Create a document reference from a path or locator.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The underlying path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentRef {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A document reference paired with its loaded text content.
///
/// This is what the submitter actually sends to the backend. Content for an
/// unreadable file is an `[ERROR: ...]` marker rather than an omission, so
/// the document still flows through the pipeline and fails validation
/// instead of silently disappearing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// The originating reference
    pub document: DocumentRef,

    /// Loaded text content (or an error marker)
    pub content: String,
}

impl SourceDocument {
    /// Create a source document.
    pub fn new(document: impl Into<DocumentRef>, content: impl Into<String>) -> Self {
        Self {
            document: document.into(),
            content: content.into(),
        }
    }
}

/// An ordered, non-empty group of document references submitted together.
///
/// Created by the chunker; consumed once by the submitter; never mutated
/// after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within the run (0-based)
    pub index: usize,

    /// Member documents, in original input order
    pub documents: Vec<DocumentRef>,
}

impl Chunk {
    /// Create a chunk.
    pub fn new(index: usize, documents: Vec<DocumentRef>) -> Self {
        Self { index, documents }
    }

    /// Create a chunk holding a single document (sync mode).
    pub fn single(index: usize, document: impl Into<DocumentRef>) -> Self {
        Self {
            index,
            documents: vec![document.into()],
        }
    }

    /// Number of member documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the chunk has no members.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Whether the chunk contains the given document.
    pub fn contains(&self, document: &DocumentRef) -> bool {
        self.documents.contains(document)
    }
}
