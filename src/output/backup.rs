//! Backup copies taken before a file is overwritten in place
//! Author: kartik4091

use chrono::Utc;
use filetime::FileTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::error::Result;

/// Candidate `n` of the backup name sequence for `source` at `timestamp`:
/// `<source>.bak_<ts>` for 0, then `<source>.bak_<ts>_1`, `<source>.bak_<ts>_2`, ...
pub fn backup_candidate(source: &Path, timestamp: i64, n: u64) -> PathBuf {
    if n == 0 {
        PathBuf::from(format!("{}.bak_{}", source.display(), timestamp))
    } else {
        PathBuf::from(format!("{}.bak_{}_{}", source.display(), timestamp, n))
    }
}

/// First candidate for which `exists` returns false
pub fn choose_backup_path<F>(source: &Path, timestamp: i64, exists: F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let mut n = 0;
    let mut candidate = backup_candidate(source, timestamp, n);
    while exists(&candidate) {
        n += 1;
        candidate = backup_candidate(source, timestamp, n);
    }
    candidate
}

/// Copies `source` byte-for-byte to a fresh backup path, keeping its timestamps.
#[instrument]
pub fn create_backup(source: &Path) -> Result<PathBuf> {
    let backup = choose_backup_path(source, Utc::now().timestamp(), |p| p.exists());
    fs::copy(source, &backup)?;

    let meta = fs::metadata(source)?;
    filetime::set_file_times(
        &backup,
        FileTime::from_last_access_time(&meta),
        FileTime::from_last_modification_time(&meta),
    )?;

    info!("Backed up {} to {}", source.display(), backup.display());
    Ok(backup)
}
