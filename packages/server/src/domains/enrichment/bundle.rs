use serde::{Deserialize, Serialize};

use super::contact_hints::ContactHints;
use super::identifier::CandidateIdentifier;
use crate::domains::leads::Lead;
use crate::kernel::{OrganicResult, RegistryRecord, SearchResult};

/// Everything gathered about one lead. Each source slot is `None` when that
/// source failed or found nothing; the lead itself is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentBundle {
    pub lead: Lead,
    /// Web-search hits, highest score first.
    #[serde(default)]
    pub web_search: Option<Vec<SearchResult>>,
    #[serde(default)]
    pub web_search_hints: Option<ContactHints>,
    #[serde(default)]
    pub identifier_search: Option<IdentifierSearch>,
    #[serde(default)]
    pub registry: Option<RegistryRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentifierSearch {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
    #[serde(default)]
    pub candidates: Vec<CandidateIdentifier>,
}

impl EnrichmentBundle {
    pub fn new(lead: Lead) -> Self {
        Self {
            lead,
            web_search: None,
            web_search_hints: None,
            identifier_search: None,
            registry: None,
        }
    }

    /// Best-ranked identifier candidate, if any.
    pub fn top_candidate(&self) -> Option<&CandidateIdentifier> {
        self.identifier_search
            .as_ref()
            .and_then(|search| search.candidates.first())
    }
}
