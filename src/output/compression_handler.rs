//! Compression handling through the external qpdf tool
//! Created: 2025-06-03 16:14:13 UTC
//! Author: kartik4091

use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::{
    config::CompressionLevel,
    error::CompressionError,
    external::ToolProvider,
};

/// qpdf flags for a compression level; empty for `None`
pub fn compression_flags(level: CompressionLevel) -> Vec<String> {
    let deflate_level = match level {
        CompressionLevel::None => return Vec::new(),
        CompressionLevel::Low => 1,
        CompressionLevel::Medium => 5,
        CompressionLevel::High => 7,
        CompressionLevel::Maximum => 9,
    };
    vec![
        format!("--compression-level={}", deflate_level),
        "--stream-data=compress".to_string(),
    ]
}

/// Runs qpdf against already-saved output files
pub struct CompressionHandler {
    tools: Arc<dyn ToolProvider>,
}

impl CompressionHandler {
    pub fn new(tools: Arc<dyn ToolProvider>) -> Self {
        Self { tools }
    }

    /// Recompresses `output` in place. Blocks until qpdf exits; there is no timeout.
    #[instrument(skip(self))]
    pub fn compress(&self, output: &Path, level: CompressionLevel) -> Result<(), CompressionError> {
        if !level.is_enabled() {
            return Ok(());
        }

        let qpdf = self
            .tools
            .qpdf_path()
            .ok_or(CompressionError::ToolUnavailable)?;

        let flags = compression_flags(level);
        debug!("Running {} {:?} --replace-input {}", qpdf.display(), flags, output.display());

        let result = Command::new(&qpdf)
            .args(&flags)
            .arg("--replace-input")
            .arg(output)
            .output()
            .map_err(CompressionError::Launch)?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                format!("qpdf exited with {}", result.status)
            } else {
                stderr
            };
            return Err(CompressionError::Failed(detail));
        }

        Ok(())
    }
}
