//! Error types and handling for the metadata remover
//! Created: 2025-06-03 11:31:05 UTC
//! Author: kartik4905

use std::{io, path::PathBuf, result::Result as StdResult};

use thiserror::Error;

/// Custom result type for metastrip operations
pub type Result<T> = StdResult<T, Error>;

/// Core error type for metastrip operations
#[derive(Error, Debug)]
#[non_exhaustive]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Input not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Invalid metadata directive: {0}")]
    DirectiveError(String),

    #[error("PDF error: {0}")]
    PdfError(#[from] lopdf::Error),

    #[error("Compression error: {0}")]
    CompressionError(#[from] CompressionError),

    #[error("Tool acquisition error: {0}")]
    ToolError(#[from] ToolError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    #[error("Concurrency error: {0}")]
    ConcurrencyError(String),
}

// -------------------- Sub-Error Categories --------------------

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CompressionError {
    #[error("compression tool unavailable")]
    ToolUnavailable,

    #[error("failed to launch qpdf: {0}")]
    Launch(#[source] io::Error),

    #[error("QPDF compression failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ToolError {
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("archive extraction failed: {0}")]
    Extraction(String),

    #[error("verification failed: {0}")]
    Verification(String),
}

impl From<ureq::Error> for ToolError {
    fn from(err: ureq::Error) -> Self {
        ToolError::Download(err.to_string())
    }
}

impl From<zip::result::ZipError> for ToolError {
    fn from(err: zip::result::ZipError) -> Self {
        ToolError::Extraction(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::ConcurrencyError(err.to_string())
    }
}
