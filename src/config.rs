//! Configuration types, persisted settings and run options
//! Author: kartik4091
//! Created: 2025-06-03

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::output::destination::Destination;

/// Default settings file, relative to the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "metastrip_config.json";

/// Compression levels, ordered from fastest to smallest output
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    clap::ValueEnum,
)]
pub enum CompressionLevel {
    /// Leave output uncompressed
    #[default]
    None,
    Low,
    Medium,
    High,
    #[value(alias = "max")]
    Maximum,
}

impl CompressionLevel {
    pub fn is_enabled(self) -> bool {
        self != CompressionLevel::None
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionLevel::None => "None",
            CompressionLevel::Low => "Low",
            CompressionLevel::Medium => "Medium",
            CompressionLevel::High => "High",
            CompressionLevel::Maximum => "Maximum",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for CompressionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionLevel::None),
            "low" => Ok(CompressionLevel::Low),
            "medium" => Ok(CompressionLevel::Medium),
            "high" => Ok(CompressionLevel::High),
            "maximum" | "max" => Ok(CompressionLevel::Maximum),
            other => Err(Error::ConfigError(format!(
                "unknown compression level '{}' (expected None, Low, Medium, High or Maximum)",
                other
            ))),
        }
    }
}

/// Settings remembered between interactive sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backup: bool,
    pub overwrite: bool,
    pub recursive: bool,
    pub show_errors: bool,
    pub output_path: String,
    pub max_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backup: true,
            overwrite: false,
            recursive: true,
            show_errors: false,
            output_path: String::new(),
            max_depth: 3,
        }
    }
}

impl Settings {
    /// Loads settings, falling back to defaults when the file is missing or corrupt.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            debug!("No settings file at {}, using defaults", path.display());
            return Self::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not read settings file {}: {}. Using defaults.", path.display(), e);
                return Self::default();
            }
        };

        // Try JSON first, then YAML
        match serde_json::from_str::<Settings>(&content)
            .map_err(|e| e.to_string())
            .or_else(|json_err| serde_yaml::from_str::<Settings>(&content).map_err(|_| json_err))
        {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Settings file {} is corrupt ({}). Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    /// Writes settings as pretty JSON. Failures are logged, never fatal.
    pub fn save(&self, path: &Path) {
        if let Err(e) = self.try_save(path) {
            warn!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    fn try_save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// The configured output location, if any
    pub fn output(&self) -> Option<PathBuf> {
        let trimmed = self.output_path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(PathBuf::from(trimmed))
        }
    }

    /// Sets a boolean or numeric option by its user-facing name.
    pub fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let flag = || parse_switch(value);
        match name.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "backup" => self.backup = flag()?,
            "overwrite" => self.overwrite = flag()?,
            "recursive" => self.recursive = flag()?,
            "show-errors" => self.show_errors = flag()?,
            "max-depth" => {
                self.max_depth = value
                    .trim()
                    .parse()
                    .map_err(|_| Error::ConfigError(format!("invalid max depth '{}'", value)))?
            }
            other => return Err(Error::ConfigError(format!("unknown option '{}'", other))),
        }
        Ok(())
    }
}

fn parse_switch(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(Error::ConfigError(format!("expected on/off, got '{}'", other))),
    }
}

/// Everything the batch driver needs to know about one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub backup: bool,
    pub overwrite: bool,
    pub recursive: bool,
    pub max_depth: usize,
    pub destination: Destination,
    pub compression: CompressionLevel,
}

impl RunConfig {
    pub fn new(
        backup: bool,
        overwrite: bool,
        output: Option<&Path>,
        compression: CompressionLevel,
    ) -> Self {
        Self {
            backup,
            overwrite,
            recursive: false,
            max_depth: 3,
            destination: Destination::from_settings(overwrite, output),
            compression,
        }
    }

    pub fn with_recursion(mut self, recursive: bool, max_depth: usize) -> Self {
        self.recursive = recursive;
        self.max_depth = max_depth;
        self
    }

    /// Builds a run from remembered settings plus the session's compression choice.
    pub fn from_settings(settings: &Settings, compression: CompressionLevel) -> Self {
        Self::new(
            settings.backup,
            settings.overwrite,
            settings.output().as_deref(),
            compression,
        )
        .with_recursion(settings.recursive, settings.max_depth)
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(false, false, None, CompressionLevel::None)
    }
}
