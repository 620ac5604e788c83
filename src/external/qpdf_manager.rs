//! QPDF Manager - Locate qpdf, or download it on first use
//!
//! Resolution order: bundled binary under the install directory, then `PATH`,
//! then (after asking once) a release archive from the qpdf GitHub releases.
//! The outcome is cached for the lifetime of the process.

use parking_lot::Mutex;
use std::env;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, error, info, warn};

use super::{Prompter, ToolProvider};
use crate::error::ToolError;

/// qpdf release fetched when the tool is missing
pub const QPDF_VERSION: &str = "12.2.0";

/// Release download root; the version tag and asset name are appended
pub const RELEASE_BASE_URL: &str = "https://github.com/qpdf/qpdf/releases/download";

/// Where the qpdf executable came from, or why there is none
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolState {
    Unresolved,
    FoundLocally(PathBuf),
    FoundOnSearchPath(PathBuf),
    UserDeclined,
    Downloaded(PathBuf),
    Unavailable,
}

impl ToolState {
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            ToolState::FoundLocally(p) | ToolState::FoundOnSearchPath(p) | ToolState::Downloaded(p) => {
                Some(p.clone())
            }
            _ => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, ToolState::Unresolved)
    }
}

/// Manages the qpdf executable for the compression step
pub struct QpdfManager {
    /// Base directory holding `bin/` (and `lib/` after a download)
    install_dir: PathBuf,
    base_url: String,
    /// Overrides the process `PATH` for lookups
    search_path: Option<OsString>,
    prompter: Box<dyn Prompter>,
    state: Mutex<ToolState>,
}

impl QpdfManager {
    /// Manager installing next to the running executable
    pub fn new(prompter: Box<dyn Prompter>) -> Self {
        Self {
            install_dir: default_install_dir(),
            base_url: RELEASE_BASE_URL.to_string(),
            search_path: None,
            prompter,
            state: Mutex::new(ToolState::Unresolved),
        }
    }

    pub fn with_install_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.install_dir = dir.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn state(&self) -> ToolState {
        self.state.lock().clone()
    }

    /// Path the bundled (or downloaded) binary lives at
    pub fn bundled_path(&self) -> PathBuf {
        self.install_dir.join("bin").join(exe_name())
    }

    /// Steps 1 and 2 only: bundled binary, then `PATH`. Never prompts.
    pub fn locate(&self) -> Option<PathBuf> {
        let mut state = self.state.lock();
        if state.is_resolved() {
            return state.path();
        }
        if let Some(found) = self.find_local() {
            *state = found;
        }
        state.path()
    }

    /// True when resolving would have to ask the user.
    pub fn needs_consent(&self) -> bool {
        self.locate().is_none() && !self.state.lock().is_resolved()
    }

    /// Settles an unresolved lookup with the user's answer: download or give up.
    pub fn acquire(&self, consent: bool) -> Option<PathBuf> {
        let mut state = self.state.lock();
        if !state.is_resolved() {
            *state = self.acquire_state(consent);
        }
        state.path()
    }

    /// Full fallback chain, asking `prompter` at most once per process.
    pub fn resolve_with(&self, prompter: &dyn Prompter) -> Option<PathBuf> {
        let mut state = self.state.lock();
        if state.is_resolved() {
            return state.path();
        }
        if let Some(found) = self.find_local() {
            *state = found;
            return state.path();
        }

        let consent = prompter.confirm(&format!(
            "QPDF is missing. Download QPDF {} automatically for compression support?",
            QPDF_VERSION
        ));
        *state = self.acquire_state(consent);
        state.path()
    }

    fn find_local(&self) -> Option<ToolState> {
        let bundled = self.bundled_path();
        if is_executable(&bundled) {
            debug!("Using bundled qpdf at {}", bundled.display());
            return Some(ToolState::FoundLocally(bundled));
        }

        let search_path = self.search_path.clone().or_else(|| env::var_os("PATH"))?;
        find_on_path(exe_name(), &search_path).map(|path| {
            debug!("Using qpdf from PATH at {}", path.display());
            ToolState::FoundOnSearchPath(path)
        })
    }

    fn acquire_state(&self, consent: bool) -> ToolState {
        if !consent {
            warn!("QPDF not downloaded. Compression will be skipped.");
            return ToolState::UserDeclined;
        }
        match self.download_and_install() {
            Ok(path) => ToolState::Downloaded(path),
            Err(e) => {
                error!("QPDF Download Error: {}", e);
                ToolState::Unavailable
            }
        }
    }

    /// Download the release archive, extract the binary and libraries, verify it runs
    fn download_and_install(&self) -> Result<PathBuf, ToolError> {
        let platform = Platform::detect()?;
        let bin_dir = self.install_dir.join("bin");
        fs::create_dir_all(&bin_dir).map_err(|e| {
            ToolError::Extraction(format!("cannot create {}: {}", bin_dir.display(), e))
        })?;

        let url = platform.download_url(&self.base_url);
        info!("Downloading QPDF from {} ...", url);

        let archive_path = bin_dir.join(&platform.asset);
        let installed = download_file(&url, &archive_path)
            .and_then(|_| self.extract_archive(&archive_path));

        // the archive is discarded whether or not extraction worked
        if let Err(e) = fs::remove_file(&archive_path) {
            debug!("Could not remove {}: {}", archive_path.display(), e);
        }
        installed?;

        let exe = self.bundled_path();
        if !exe.exists() {
            return Err(ToolError::Verification(
                "QPDF binary not found after extraction.".into(),
            ));
        }
        make_executable(&exe)?;
        verify_binary(&exe)?;

        info!("QPDF installed at {}", exe.display());
        Ok(exe)
    }

    /// Copies `*/bin/<exe>`, `*/bin/*.dll` into `bin/` and shared libraries into `lib/`
    fn extract_archive(&self, archive_path: &Path) -> Result<(), ToolError> {
        let file = File::open(archive_path)
            .map_err(|e| ToolError::Extraction(format!("cannot open archive: {}", e)))?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

        let mut extracted = 0usize;
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() || is_symlink(entry.unix_mode()) {
                continue;
            }

            let Some((dir, file_name)) = member_target(entry.name()) else {
                continue;
            };

            let target_dir = self.install_dir.join(dir);
            fs::create_dir_all(&target_dir)
                .map_err(|e| ToolError::Extraction(e.to_string()))?;
            let target = target_dir.join(&file_name);
            let mut out = File::create(&target)
                .map_err(|e| ToolError::Extraction(format!("{}: {}", target.display(), e)))?;
            io::copy(&mut entry, &mut out)
                .map_err(|e| ToolError::Extraction(format!("{}: {}", target.display(), e)))?;
            extracted += 1;
        }

        debug!("Extracted {} file(s) from {}", extracted, archive_path.display());
        Ok(())
    }
}

impl ToolProvider for QpdfManager {
    fn qpdf_path(&self) -> Option<PathBuf> {
        self.resolve_with(self.prompter.as_ref())
    }
}

/// Release asset naming for the running platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Archive file name, e.g. `qpdf-12.2.0-bin-linux-x86_64.zip`
    pub asset: String,
}

impl Platform {
    pub fn detect() -> Result<Self, ToolError> {
        let flavour = if cfg!(target_os = "windows") {
            if cfg!(target_pointer_width = "64") {
                "msvc64"
            } else {
                "msvc32"
            }
        } else if cfg!(target_os = "macos") {
            "bin-mac-x86_64"
        } else if cfg!(all(target_os = "linux", target_arch = "x86_64")) {
            "bin-linux-x86_64"
        } else {
            return Err(ToolError::UnsupportedPlatform(format!(
                "{}-{}",
                env::consts::OS,
                env::consts::ARCH
            )));
        };

        Ok(Self {
            asset: format!("qpdf-{}-{}.zip", QPDF_VERSION, flavour),
        })
    }

    pub fn download_url(&self, base_url: &str) -> String {
        format!("{}/v{}/{}", base_url, QPDF_VERSION, self.asset)
    }
}

fn default_install_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn exe_name() -> &'static str {
    if cfg!(windows) {
        "qpdf.exe"
    } else {
        "qpdf"
    }
}

/// Maps an archive member to (`bin` | `lib`, file name), or `None` to skip it.
fn member_target(member: &str) -> Option<(&'static str, String)> {
    let mut parts = member.trim_end_matches('/').rsplit('/');
    let file_name = parts.next()?;
    let parent = parts.next()?;

    let lower = file_name.to_ascii_lowercase();
    match parent {
        "bin" if file_name == exe_name() || lower.ends_with(".dll") => {
            Some(("bin", file_name.to_string()))
        }
        "lib" if lower.contains(".so") || lower.ends_with(".dylib") => {
            Some(("lib", file_name.to_string()))
        }
        _ => None,
    }
}

fn is_symlink(mode: Option<u32>) -> bool {
    mode.map(|m| m & 0o170000 == 0o120000).unwrap_or(false)
}

fn find_on_path(exe: &str, search_path: &OsString) -> Option<PathBuf> {
    env::split_paths(search_path)
        .map(|dir| dir.join(exe))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), ToolError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(|e| ToolError::Extraction(format!("chmod {}: {}", path.display(), e)))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), ToolError> {
    Ok(())
}

fn download_file(url: &str, dest: &Path) -> Result<(), ToolError> {
    let response = ureq::get(url).call()?;
    let mut reader = response.into_reader();
    let mut file = File::create(dest)
        .map_err(|e| ToolError::Download(format!("{}: {}", dest.display(), e)))?;
    let bytes = io::copy(&mut reader, &mut file)
        .map_err(|e| ToolError::Download(format!("reading {}: {}", url, e)))?;
    debug!("Downloaded {} bytes to {}", bytes, dest.display());
    Ok(())
}

fn verify_binary(exe: &Path) -> Result<(), ToolError> {
    let output = Command::new(exe)
        .arg("--version")
        .output()
        .map_err(|e| ToolError::Verification(format!("cannot run {}: {}", exe.display(), e)))?;
    if !output.status.success() {
        return Err(ToolError::Verification(format!(
            "{} --version exited with {}",
            exe.display(),
            output.status
        )));
    }
    Ok(())
}
