//! Single-file processing: backup, metadata rewrite, save, compress
//! Author: kartik4091
//! Created: 2025-06-05

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lopdf::Document;
use tracing::{debug, instrument, warn};

use super::outcome::FileOutcome;
use super::progress::ProgressSink;
use crate::{
    config::RunConfig,
    error::{Error, Result},
    external::ToolProvider,
    metadata::{DirectiveSet, InfoCleaner},
    output::{create_backup, CompressionHandler},
    utils::{ensure_parent_dir, file_size, replace_file, temp_sibling, LogLevel},
};

/// Applies one run's configuration and directives to individual files
pub struct FileProcessor {
    config: RunConfig,
    directives: DirectiveSet,
    cleaner: InfoCleaner,
    compressor: CompressionHandler,
}

impl FileProcessor {
    pub fn new(config: RunConfig, directives: DirectiveSet, tools: Arc<dyn ToolProvider>) -> Self {
        Self {
            config,
            directives,
            cleaner: InfoCleaner::new(),
            compressor: CompressionHandler::new(tools),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn directives(&self) -> &DirectiveSet {
        &self.directives
    }

    pub fn destination_for(&self, source: &Path) -> PathBuf {
        self.config.destination.resolve(source)
    }

    /// Processes `source` into `destination`. Errors and panics become
    /// [`FileOutcome::Failure`].
    #[instrument(skip(self, sink))]
    pub fn process(&self, source: &Path, destination: &Path, sink: &dyn ProgressSink) -> FileOutcome {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            self.try_process(source, destination, sink)
        }));
        match attempt {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => FileOutcome::Failure {
                reason: e.to_string(),
            },
            Err(payload) => {
                let reason = format!("internal error: {}", panic_message(payload.as_ref()));
                warn!("Processing {} panicked: {}", source.display(), reason);
                FileOutcome::Failure { reason }
            }
        }
    }

    fn try_process(
        &self,
        source: &Path,
        destination: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<FileOutcome> {
        let before = file_size(source)?;

        if self.config.backup && self.config.overwrite && same_file(source, destination) {
            let backup = create_backup(source)?;
            sink.log(
                LogLevel::Info,
                format!("Backup created: {}", backup.display()),
            );
        }

        let mut doc = Document::load(source)?;
        self.cleaner.apply(&mut doc, &self.directives)?;
        save_atomically(doc, destination)?;

        if self.config.compression.is_enabled() {
            self.compressor
                .compress(destination, self.config.compression)
                .map_err(Error::from)?;

            let after = file_size(destination)?;
            if after > before {
                sink.log(
                    LogLevel::Warning,
                    format!(
                        "{} grew after compression ({} -> {} bytes)",
                        destination.display(),
                        before,
                        after
                    ),
                );
                return Ok(FileOutcome::SizeRegression { before, after });
            }
        }

        Ok(FileOutcome::Success)
    }
}

/// Writes to a hidden sibling first so a failed save never truncates `destination`.
/// Takes the document by value so it is closed before the rename.
fn save_atomically(mut doc: Document, destination: &Path) -> Result<()> {
    ensure_parent_dir(destination)?;
    let temp = temp_sibling(destination);

    let saved = doc.save(&temp).map(drop);
    drop(doc);
    if let Err(e) = saved {
        let _ = fs::remove_file(&temp);
        return Err(e.into());
    }

    if let Err(e) = replace_file(&temp, destination) {
        warn!("Could not move {} into place", temp.display());
        let _ = fs::remove_file(&temp);
        return Err(e);
    }

    debug!("Saved {}", destination.display());
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
