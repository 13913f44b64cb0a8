//! Indexing domain - denormalized lead documents for search.

pub mod stage;

pub use stage::{lead_document, IndexingStage, COMBINED_LEADS_INDEX};
