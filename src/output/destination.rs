//! Output path resolution
//! Author: kartik4091

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Suffix inserted before the extension when writing beside the source
pub const CLEAN_SUFFIX: &str = "_clean";

/// Where processed files are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Destination {
    /// Overwrite the source file
    InPlace,
    /// Existing directory; output keeps the source file name
    Directory(PathBuf),
    /// Literal output path used for every file
    File(PathBuf),
    /// `<stem>_clean.<ext>` next to the source
    Sibling,
}

impl Destination {
    /// Decides the destination kind once per run.
    ///
    /// This is the only place the filesystem is consulted; `resolve` is pure.
    pub fn from_settings(overwrite: bool, output: Option<&Path>) -> Self {
        if overwrite {
            return Destination::InPlace;
        }
        match output {
            Some(path) if path.as_os_str().is_empty() => Destination::Sibling,
            Some(path) if path.is_dir() => Destination::Directory(path.to_path_buf()),
            Some(path) => Destination::File(path.to_path_buf()),
            None => Destination::Sibling,
        }
    }

    /// Output path for `source`
    pub fn resolve(&self, source: &Path) -> PathBuf {
        match self {
            Destination::InPlace => source.to_path_buf(),
            Destination::Directory(dir) => match source.file_name() {
                Some(name) => dir.join(name),
                None => dir.clone(),
            },
            Destination::File(path) => path.clone(),
            Destination::Sibling => sibling_path(source),
        }
    }

    pub fn is_in_place(&self) -> bool {
        matches!(self, Destination::InPlace)
    }
}

fn sibling_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, CLEAN_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, CLEAN_SUFFIX),
    };
    source.with_file_name(name)
}
