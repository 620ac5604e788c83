#[path = "../fixtures/mod.rs"]
mod fixtures;

mod download_integration;
mod pipeline_integration;
