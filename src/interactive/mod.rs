//! Interactive terminal front end

pub mod commands;
pub mod session;

pub use commands::{parse_command, split_words, Command};
pub use session::{drive, run, Flow, Session};
