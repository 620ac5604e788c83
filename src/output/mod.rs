//! Output side of processing: where files go, backups, and recompression

pub mod backup;
pub mod compression_handler;
pub mod destination;

pub use backup::{choose_backup_path, create_backup};
pub use compression_handler::{compression_flags, CompressionHandler};
pub use destination::{Destination, CLEAN_SUFFIX};
