pub mod enrich;

pub use enrich::{enrich, identifier_query, web_query, EnrichmentSources};
