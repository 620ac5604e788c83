#[path = "../fixtures/mod.rs"]
mod fixtures;

mod output_tests;
mod scanner_tests;
