//! Main Library File for batch PDF metadata removal and editing
//! Discovers PDFs, rewrites their document-information dictionary,
//! and optionally recompresses the output with qpdf.

// Configuration and errors
pub mod config;
pub mod error;

// Discovery
pub mod scanner;

// Metadata directives and the info-dictionary cleaner
pub mod metadata;

// Destinations, backups and compression
pub mod output;

// External tool resolution
pub mod external;

// Batch driver and reporting
pub mod pipeline;
pub mod report;

// Front ends
pub mod interactive;

pub mod utils;

pub use config::{CompressionLevel, RunConfig, Settings};
pub use error::{CompressionError, Error, Result, ToolError};
pub use metadata::{DirectiveSet, FieldDirective, InfoCleaner, MetadataAction};
pub use output::Destination;
pub use pipeline::{
    CancelToken, FileOutcome, FileProcessor, Pipeline, ProgressEvent, ProgressSink, RunStatus,
    RunSummary,
};
pub use report::{FileRecord, RunReport};
pub use scanner::{FileScanner, ScanOptions, ScanResult};
