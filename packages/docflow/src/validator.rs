//! Result validator - partition task results into valid and failed records.
//!
//! Validation is per-document: one bad record never invalidates its
//! siblings, and a document the backend dropped from the result set is
//! itself a failure, not an omission.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::types::document::Chunk;
use crate::types::record::{ExtractedDocument, FailureReason, FailureRecord, ValidatedRecord};
use crate::types::task::RawRecord;

/// Minimum content length accepted by the default check set.
pub const DEFAULT_MIN_CONTENT_LENGTH: usize = 10;

/// Placeholder values the model emits when it has nothing to say.
const PLACEHOLDER_VALUES: &[&str] = &["No content received", "N/A", "n/a", "none", "null"];

/// A named quality predicate applied to each extracted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityCheck {
    /// Title and content must be present and non-empty
    RequiredFields,

    /// Content must be at least this many characters after trimming
    MinContentLength(usize),

    /// Content must not be a known placeholder or an error marker
    NonPlaceholder,
}

impl QualityCheck {
    /// Apply this check, returning the failure reason on rejection.
    pub fn apply(&self, data: &ExtractedDocument) -> Result<(), FailureReason> {
        match self {
            Self::RequiredFields => {
                if data.title.trim().is_empty() {
                    return Err(FailureReason::MissingTitle);
                }
                if data.content.trim().is_empty() {
                    return Err(FailureReason::MissingContent);
                }
                Ok(())
            }
            Self::MinContentLength(min) => {
                if data.content.trim().len() < *min {
                    return Err(FailureReason::ContentTooShort);
                }
                Ok(())
            }
            Self::NonPlaceholder => {
                let content = data.content.trim();
                if content.starts_with("[ERROR:")
                    || PLACEHOLDER_VALUES.iter().any(|p| content.eq_ignore_ascii_case(p))
                {
                    return Err(FailureReason::PlaceholderContent);
                }
                Ok(())
            }
        }
    }
}

/// The default check set: required fields, minimum length, no placeholders.
pub fn default_checks() -> Vec<QualityCheck> {
    vec![
        QualityCheck::RequiredFields,
        QualityCheck::MinContentLength(DEFAULT_MIN_CONTENT_LENGTH),
        QualityCheck::NonPlaceholder,
    ]
}

/// Per-document validation outcomes for one task result.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Records that passed all checks, in chunk order
    pub valid: Vec<ValidatedRecord>,

    /// Records that failed, in chunk order
    pub invalid: Vec<FailureRecord>,
}

impl ValidationReport {
    /// Total documents accounted for.
    pub fn total(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }
}

/// Parse raw model output into the expected shape.
///
/// Output that parses as [`ExtractedDocument`] JSON is used directly;
/// anything else is wrapped as a plain-text document (title "Document") so
/// the quality checks still get a chance to accept or reject it.
pub fn parse_raw_output(raw: &str) -> ExtractedDocument {
    match serde_json::from_str::<ExtractedDocument>(raw) {
        Ok(data) => data,
        Err(_) => ExtractedDocument::new("Document", raw.trim()),
    }
}

/// Validate a task result against its originating chunk.
///
/// Every chunk member resolves to exactly one outcome: a validated record,
/// or a failure record with a specific reason (`missing_result` when the
/// backend returned nothing for it). Chunk order is preserved in both
/// partitions. Result entries for documents outside the chunk are ignored.
pub fn validate_task_result(
    chunk: &Chunk,
    records: &[RawRecord],
    checks: &[QualityCheck],
    task_id: &str,
) -> ValidationReport {
    let mut by_document: HashMap<&str, &RawRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if !chunk.contains(&record.document) {
            warn!(
                task_id,
                document = %record.document,
                "backend returned a record for a document outside the chunk"
            );
            continue;
        }
        by_document.insert(record.document.as_str(), record);
    }

    let mut report = ValidationReport::default();

    for document in &chunk.documents {
        let Some(raw) = by_document.get(document.as_str()) else {
            warn!(task_id, document = %document, "document missing from result set");
            report.invalid.push(
                FailureRecord::new(document.clone(), FailureReason::MissingResult)
                    .with_task_id(task_id),
            );
            continue;
        };

        let data = parse_raw_output(&raw.content);

        match checks.iter().find_map(|check| check.apply(&data).err()) {
            None => {
                debug!(task_id, document = %document, "record validated");
                report
                    .valid
                    .push(ValidatedRecord::new(document.clone(), task_id, data));
            }
            Some(reason) => {
                warn!(task_id, document = %document, reason = %reason, "record rejected");
                report
                    .invalid
                    .push(FailureRecord::new(document.clone(), reason).with_task_id(task_id));
            }
        }
    }

    report
}
