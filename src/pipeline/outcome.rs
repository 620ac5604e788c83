//! Per-file outcomes and the run tally

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of processing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileOutcome {
    Success,
    /// Processed, but qpdf made the file larger than the source
    SizeRegression { before: u64, after: u64 },
    Failure { reason: String },
}

impl FileOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failure { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Complete,
    Cancelled,
}

/// Counts for a run. Regressions are also counted as successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub success: usize,
    pub errors: usize,
    pub regressions: usize,
    pub status: RunStatus,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            success: 0,
            errors: 0,
            regressions: 0,
            status: RunStatus::Complete,
        }
    }

    pub fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Success => self.success += 1,
            FileOutcome::SizeRegression { .. } => {
                self.success += 1;
                self.regressions += 1;
            }
            FileOutcome::Failure { .. } => self.errors += 1,
        }
    }

    pub fn processed(&self) -> usize {
        self.success + self.errors
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Success: {}, Errors: {}, Files with increased size after compression: {}",
            self.success, self.errors, self.regressions
        )
    }
}
