//! Best-effort enrichment of one lead from three independent sources.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domains::enrichment::bundle::{EnrichmentBundle, IdentifierSearch};
use crate::domains::enrichment::contact_hints::contact_hints;
use crate::domains::enrichment::identifier;
use crate::domains::leads::Lead;
use crate::kernel::{BaseIdentifierSearch, BaseRegistry, BaseSearchService};

/// Organic results requested from the identifier search.
const IDENTIFIER_RESULTS: usize = 10;

#[derive(Clone)]
pub struct EnrichmentSources {
    pub web_search: Arc<dyn BaseSearchService>,
    pub identifier_search: Arc<dyn BaseIdentifierSearch>,
    pub registry: Arc<dyn BaseRegistry>,
}

fn is_brazil(country: &str) -> bool {
    matches!(
        country.trim().to_lowercase().as_str(),
        "brazil" | "brasil" | "br"
    )
}

/// `"{name} {city} {state}"`, plus ` CNPJ` for Brazilian leads.
pub fn web_query(lead: &Lead) -> String {
    let mut query = [&lead.business_name, &lead.city, &lead.state]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if is_brazil(&lead.country) {
        query.push_str(" CNPJ");
    }
    query
}

/// `"{name}, {city} CNPJ"`
pub fn identifier_query(lead: &Lead) -> String {
    let name = lead.business_name.trim();
    let city = lead.city.trim();
    if city.is_empty() {
        format!("{} CNPJ", name)
    } else {
        format!("{}, {} CNPJ", name, city)
    }
}

/// Query every source concurrently. A failing source leaves its slot empty.
pub async fn enrich(lead: Lead, sources: &EnrichmentSources) -> EnrichmentBundle {
    let web_query = web_query(&lead);
    let identifier_query = identifier_query(&lead);

    let (web, organic, registry) = tokio::join!(
        sources.web_search.search(&web_query, None),
        sources
            .identifier_search
            .search(&identifier_query, IDENTIFIER_RESULTS),
        sources.registry.lookup(&lead.business_name, &lead.city),
    );

    let mut bundle = EnrichmentBundle::new(lead);
    let lead_id = bundle.lead.id;

    match web {
        Ok(mut results) => {
            results.sort_by(|a, b| b.score.total_cmp(&a.score));
            let hints = contact_hints(&results);
            debug!(lead_id = %lead_id, results = results.len(), "Web search done");
            if !hints.is_empty() {
                bundle.web_search_hints = Some(hints);
            }
            bundle.web_search = Some(results);
        }
        Err(e) => warn!(lead_id = %lead_id, source = "web_search", error = %e, "Enrichment source failed"),
    }

    match organic {
        Ok(organic) => {
            let candidates = identifier::extract(&organic, &bundle.lead.business_name);
            debug!(lead_id = %lead_id, candidates = candidates.len(), "Identifier search done");
            bundle.identifier_search = Some(IdentifierSearch {
                organic,
                candidates,
            });
        }
        Err(e) => warn!(lead_id = %lead_id, source = "identifier_search", error = %e, "Enrichment source failed"),
    }

    match registry {
        Ok(Some(record)) => bundle.registry = Some(record),
        Ok(None) => debug!(lead_id = %lead_id, city = %bundle.lead.city, "No registry match"),
        Err(e) => warn!(lead_id = %lead_id, source = "registry", error = %e, "Enrichment source failed"),
    }

    info!(
        lead_id = %lead_id,
        web_search = bundle.web_search.is_some(),
        identifier_search = bundle.identifier_search.is_some(),
        registry = bundle.registry.is_some(),
        "Lead enriched"
    );

    bundle
}
