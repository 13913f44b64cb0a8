//! Enrichment domain - best-effort aggregation of web search, identifier
//! search and registry data around a discovered lead.

pub mod activities;
pub mod bundle;
pub mod contact_hints;
pub mod identifier;
pub mod stage;

pub use activities::{enrich, EnrichmentSources};
pub use bundle::{EnrichmentBundle, IdentifierSearch};
pub use contact_hints::ContactHints;
pub use identifier::CandidateIdentifier;
pub use stage::EnrichmentStage;
