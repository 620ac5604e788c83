//! Batch driver: runs every selected file through the processor in order
//! Author: kartik4091
//! Created: 2025-06-05

pub mod outcome;
pub mod processor;
pub mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

pub use outcome::{FileOutcome, RunStatus, RunSummary};
pub use processor::FileProcessor;
pub use progress::{CancelToken, ProgressEvent, ProgressSink, TracingSink};

use crate::error::Result;
use crate::report::{FileRecord, RunReport};

/// Sequential batch over a list of files
pub struct Pipeline {
    processor: FileProcessor,
}

impl Pipeline {
    pub fn new(processor: FileProcessor) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &FileProcessor {
        &self.processor
    }

    /// Processes `files` one after another on the calling thread.
    ///
    /// Cancellation is only observed between files; a file that has started
    /// always finishes. A failing file never stops the batch.
    #[instrument(skip_all, fields(total = files.len()))]
    pub fn execute_blocking(
        &self,
        files: &[PathBuf],
        cancel: &CancelToken,
        sink: &dyn ProgressSink,
    ) -> RunReport {
        let total = files.len();
        let mut report = RunReport::begin(total);
        sink.emit(ProgressEvent::Started { total });

        for (i, source) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping before file {}", i + 1);
                report.finish(RunStatus::Cancelled);
                sink.emit(ProgressEvent::Finished(report.summary));
                return report;
            }

            let index = i + 1;
            sink.emit(ProgressEvent::FileStarted {
                index,
                total,
                path: source.clone(),
            });

            let destination = self.processor.destination_for(source);
            let outcome = self.processor.process(source, &destination, sink);

            sink.emit(ProgressEvent::FileFinished {
                index,
                source: source.clone(),
                destination: destination.clone(),
                outcome: outcome.clone(),
            });
            report.push(FileRecord {
                source: source.clone(),
                destination,
                outcome,
                finished_at: Utc::now(),
            });
        }

        report.finish(RunStatus::Complete);
        sink.emit(ProgressEvent::Finished(report.summary));
        report
    }

    /// Runs [`Pipeline::execute_blocking`] on the blocking thread pool.
    pub async fn execute(
        self: Arc<Self>,
        files: Vec<PathBuf>,
        cancel: CancelToken,
        sink: Arc<dyn ProgressSink>,
    ) -> Result<RunReport> {
        let report = tokio::task::spawn_blocking(move || {
            self.execute_blocking(&files, &cancel, sink.as_ref())
        })
        .await?;
        Ok(report)
    }
}
