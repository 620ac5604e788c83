//! External collaborators: the qpdf binary and how it is found or fetched

pub mod prompt;
pub mod qpdf_manager;

use std::path::PathBuf;

pub use prompt::{is_yes, ConsolePrompter, FixedAnswer, Prompter};
pub use qpdf_manager::{Platform, QpdfManager, ToolState, QPDF_VERSION};

/// Source of the qpdf executable for the compression step
pub trait ToolProvider: Send + Sync {
    /// Path to qpdf, or `None` when compression is unavailable for this run
    fn qpdf_path(&self) -> Option<PathBuf>;
}

/// A provider with a predetermined answer
#[derive(Debug, Clone, Default)]
pub struct FixedTool(pub Option<PathBuf>);

impl ToolProvider for FixedTool {
    fn qpdf_path(&self) -> Option<PathBuf> {
        self.0.clone()
    }
}
