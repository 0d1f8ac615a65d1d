//! Per-run statistics and the run report.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::record::FailureRecord;

/// Counters scoped to one pipeline invocation.
///
/// Reset per invocation; never persisted beyond the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Documents sent to the backend (retried submissions count again)
    pub submitted: usize,

    /// Documents whose task reached a completed result
    pub completed: usize,

    /// Documents validated and persisted
    pub validated: usize,

    /// Documents permanently recorded as failed
    pub failed: usize,

    /// Documents resubmitted in a retry round
    pub retried: usize,
}

impl RunStats {
    /// Fold another stats delta into this one.
    pub fn merge(&mut self, other: RunStats) {
        self.submitted += other.submitted;
        self.completed += other.completed;
        self.validated += other.validated;
        self.failed += other.failed;
        self.retried += other.retried;
    }

    /// Documents that reached a terminal outcome.
    pub fn terminated(&self) -> usize {
        self.validated + self.failed
    }
}

/// Terminal output of one pipeline invocation.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Identifier of this run (persistence key component)
    pub run_id: Uuid,

    /// Aggregated counters
    pub stats: RunStats,

    /// Terminal failures, in recording order
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    /// Whether every document was validated and persisted.
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}
