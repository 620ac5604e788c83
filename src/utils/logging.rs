//! Logging utilities shared by the batch driver and the front ends
//! Author: kartik4091

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Severity levels for log-pane entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level_str = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", level_str)
    }
}

/// Log entry structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Builds an entry stamped with the current time and emits it to tracing.
    pub fn emit(level: LogLevel, message: impl Into<String>) -> Self {
        let entry = Self::new(level, message);

        match level {
            LogLevel::Debug => debug!("{}", entry.message),
            LogLevel::Info => info!("{}", entry.message),
            LogLevel::Warning => warn!("{}", entry.message),
            LogLevel::Error => error!("{}", entry.message),
        }

        entry
    }

    /// `[TAG] message`, the form the log pane prints
    pub fn tagged(&self) -> String {
        format!("[{}] {}", self.level, self.message)
    }
}
