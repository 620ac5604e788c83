//! Run reports: per-file records plus the final tally
//! Author: kartik4091
//! Created: 2025-06-05

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::pipeline::{FileOutcome, RunStatus, RunSummary};
use crate::utils::{ensure_parent_dir, has_allowed_extension};

/// Report output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    PlainText,
    Json,
}

impl ReportFormat {
    /// `.json` gets JSON, anything else plain text
    pub fn for_path(path: &Path) -> Self {
        if has_allowed_extension(path, &["json"]) {
            ReportFormat::Json
        } else {
            ReportFormat::PlainText
        }
    }
}

/// One processed file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: FileOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Complete record of a batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub summary: RunSummary,
    pub files: Vec<FileRecord>,
}

impl RunReport {
    pub fn begin(total: usize) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            summary: RunSummary::new(total),
            files: Vec::with_capacity(total),
        }
    }

    pub fn push(&mut self, record: FileRecord) {
        self.summary.record(&record.outcome);
        self.files.push(record);
    }

    pub fn finish(&mut self, status: RunStatus) {
        self.summary.status = status;
        self.finished_at = Some(Utc::now());
    }

    pub fn status(&self) -> RunStatus {
        self.summary.status
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_text(&self) -> String {
        let mut content = String::new();
        content.push_str("PDF Metadata Run Report\n");
        content.push_str("=======================\n\n");
        content.push_str(&format!("Started: {}\n", self.started_at.to_rfc3339()));
        if let Some(finished) = self.finished_at {
            content.push_str(&format!("Finished: {}\n", finished.to_rfc3339()));
        }
        content.push_str(&format!("Status: {:?}\n", self.summary.status));
        content.push_str(&format!(
            "Processed: {} of {}\n",
            self.summary.processed(),
            self.summary.total
        ));
        content.push_str(&format!("{}\n\n", self.summary));

        content.push_str("Files:\n");
        content.push_str("------\n");
        for record in &self.files {
            let line = match &record.outcome {
                FileOutcome::Success => format!(
                    "[OK] {} -> {}",
                    record.source.display(),
                    record.destination.display()
                ),
                FileOutcome::SizeRegression { before, after } => format!(
                    "[LARGER] {} -> {} ({} -> {} bytes)",
                    record.source.display(),
                    record.destination.display(),
                    before,
                    after
                ),
                FileOutcome::Failure { reason } => {
                    format!("[FAILED] {}: {}", record.source.display(), reason)
                }
            };
            content.push_str(&line);
            content.push('\n');
        }
        content
    }

    /// Writes the report, choosing the format from the file extension.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = match ReportFormat::for_path(path) {
            ReportFormat::Json => self.to_json()?,
            ReportFormat::PlainText => self.to_text(),
        };
        ensure_parent_dir(path)?;
        fs::write(path, content)?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}
