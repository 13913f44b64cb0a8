// Business domains
pub mod discovery;
pub mod enrichment;
pub mod extraction;
pub mod indexing;
pub mod leads;
