//! Input discovery

pub mod pdf_scanner;

pub use pdf_scanner::{is_valid_pdf, FileScanner, ScanOptions, ScanResult};
