//! PDF file discovery
//! Created: 2025-06-03
//! Author: kartik4091

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::utils::io::{has_allowed_extension, read_signature, PDF_SIGNATURE};

/// Traversal policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub recursive: bool,
    /// Deepest directory level entered below a root (root contents are level 0).
    /// `0` means unlimited when `recursive` is set.
    pub max_depth: usize,
    /// Also require the `%PDF` signature, not just the extension
    pub validate_signature: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            recursive: false,
            max_depth: 3,
            validate_signature: true,
        }
    }
}

/// Result of a scan over several roots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    /// Deduplicated, sorted candidate files
    pub files: Vec<PathBuf>,
    /// Roots that do not exist
    pub missing: Vec<PathBuf>,
}

/// `.pdf` extension (any case) and a `%PDF` header
pub fn is_valid_pdf(path: &Path) -> bool {
    if !has_allowed_extension(path, &["pdf"]) {
        return false;
    }
    match read_signature(path) {
        Ok(header) => header.as_slice() == PDF_SIGNATURE,
        Err(_) => false,
    }
}

/// Collects candidate PDFs from files and directories
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    options: ScanOptions,
}

impl FileScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    #[instrument(skip(self, roots))]
    pub fn collect<P: AsRef<Path>>(&self, roots: &[P]) -> ScanResult {
        let mut found = BTreeSet::new();
        let mut missing = Vec::new();

        for root in roots {
            let root = root.as_ref();
            if root.is_file() {
                if self.qualifies(root) {
                    found.insert(root.to_path_buf());
                }
            } else if root.is_dir() {
                self.walk(root, &mut found);
            } else {
                warn!("File or folder does not exist: {}", root.display());
                missing.push(root.to_path_buf());
            }
        }

        debug!("Discovered {} PDF file(s)", found.len());
        ScanResult {
            files: found.into_iter().collect(),
            missing,
        }
    }

    fn qualifies(&self, path: &Path) -> bool {
        if self.options.validate_signature {
            is_valid_pdf(path)
        } else {
            has_allowed_extension(path, &["pdf"])
        }
    }

    /// Walk depth limit. Root contents sit at walkdir depth 1, so a
    /// `max_depth` of N allows N + 1.
    fn walk_limit(&self) -> Option<usize> {
        match (self.options.recursive, self.options.max_depth) {
            (false, _) => Some(1),
            (true, 0) => None,
            (true, n) => Some(n + 1),
        }
    }

    fn walk(&self, dir: &Path, found: &mut BTreeSet<PathBuf>) {
        let mut walker = WalkDir::new(dir).follow_links(false).min_depth(1);
        if let Some(limit) = self.walk_limit() {
            walker = walker.max_depth(limit);
        }

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot read entry under {}: {}", dir.display(), e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.qualifies(entry.path()) {
                found.insert(entry.into_path());
            }
        }
    }
}
