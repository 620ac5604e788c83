//! IO Utilities for File Operations
//! Author: kartik4091

use std::{
    fs::{self, File},
    io::Read,
    path::{Path, PathBuf},
};

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::Result;

/// Magic bytes every PDF file starts with.
pub const PDF_SIGNATURE: &[u8; 4] = b"%PDF";

/// Returns true if path has one of the allowed extensions.
pub fn has_allowed_extension(path: &Path, allowed: &[&str]) -> bool {
    match path.extension() {
        Some(ext) => allowed.iter().any(|e| ext.eq_ignore_ascii_case(*e)),
        None => false,
    }
}

/// Reads up to the first four bytes of a file.
pub fn read_signature(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = [0u8; 4];
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(buffer[..filled].to_vec())
}

/// Ensures parent directory exists for a file path.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Unique hidden sibling path used while a file is being rewritten.
pub fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// Renames a file into place, replacing the target.
#[instrument]
pub fn replace_file(from: &Path, to: &Path) -> Result<()> {
    fs::rename(from, to)?;
    debug!("Replaced {}", to.display());
    Ok(())
}

/// File size in bytes.
pub fn file_size(path: &Path) -> Result<u64> {
    Ok(fs::metadata(path)?.len())
}
