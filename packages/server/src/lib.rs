// Lead generation pipeline - core library
//
// Discovery turns directory searches into leads, and three broker-driven
// stages (enrichment, AI extraction, indexing) complete them.
// Each stage lives in domains/*/stage.rs and runs as its own binary.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
