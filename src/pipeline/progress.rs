//! Progress reporting and cancellation for a batch run

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use super::outcome::{FileOutcome, RunSummary};
use crate::utils::{LogEntry, LogLevel};

/// Shared stop flag, checked by the batch driver before each file
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a front end hears about a running batch
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    FileStarted {
        index: usize,
        total: usize,
        path: PathBuf,
    },
    Log(LogEntry),
    FileFinished {
        index: usize,
        source: PathBuf,
        destination: PathBuf,
        outcome: FileOutcome,
    },
    Finished(RunSummary),
    /// The batch ended without a summary; per-file events already sent stand
    Aborted {
        reason: String,
    },
}

/// Receiver of [`ProgressEvent`]s
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);

    /// Emits to tracing and forwards the entry to the sink.
    fn log(&self, level: LogLevel, message: String) {
        self.emit(ProgressEvent::Log(LogEntry::emit(level, message)));
    }
}

/// Writes progress through `tracing` only
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn emit(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { total } => info!("Processing {} file(s)", total),
            ProgressEvent::FileStarted { index, total, path } => {
                info!("[{}/{}] {}", index, total, path.display())
            }
            // Already traced by LogEntry::emit
            ProgressEvent::Log(_) => {}
            ProgressEvent::FileFinished {
                source, outcome, ..
            } => match outcome {
                FileOutcome::Success => info!("Processed: {}", source.display()),
                FileOutcome::SizeRegression { before, after } => warn!(
                    "Processed (larger after compression): {} ({} -> {} bytes)",
                    source.display(),
                    before,
                    after
                ),
                FileOutcome::Failure { reason } => {
                    error!("Error processing: {}: {}", source.display(), reason)
                }
            },
            ProgressEvent::Finished(summary) => info!("{}", summary),
            ProgressEvent::Aborted { reason } => error!("Batch aborted: {}", reason),
        }
    }
}

impl ProgressSink for UnboundedSender<ProgressEvent> {
    fn emit(&self, event: ProgressEvent) {
        // The receiver goes away when the session quits mid-run
        let _ = self.send(event);
    }
}
