//! Utility Module Implementation
//! Author: kartik4091
//! Created: 2025-06-03 09:14:13 UTC
//!
//! Aggregates internal utility helpers for file IO and log entries.

pub mod io;
pub mod logging;

pub use self::{
    io::*,
    logging::{LogEntry, LogLevel},
};
