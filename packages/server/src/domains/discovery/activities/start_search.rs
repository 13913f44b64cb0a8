//! Search job: discover places, fetch their details and record them as leads.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::discover::{checked_radius, discover, DiscoverRequest, DiscoveryError};
use crate::domains::leads::activities::save_leads::RecordError;
use crate::domains::leads::{record_lead, NewLead, StoreError};
use crate::kernel::ServerDeps;

fn default_country() -> String {
    "br".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartSearchRequest {
    pub category: String,
    pub location: String,
    #[serde(default = "default_country")]
    pub country: String,
    pub radius: u32,
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSummary {
    pub places_seen: usize,
    pub leads_created: usize,
    pub leads_skipped: usize,
}

pub async fn start_search(
    request: StartSearchRequest,
    deps: &ServerDeps,
) -> Result<SearchSummary, DiscoveryError> {
    let radius = checked_radius(request.radius)?;
    let discover_request = DiscoverRequest::builder()
        .query(request.category.clone())
        .location(request.location.clone())
        .country(request.country.clone())
        .radius_meters(request.radius)
        .max_pages(request.max_pages.unwrap_or(3))
        .max_results(request.max_results.unwrap_or(20))
        .page_delay(deps.page_delay)
        .build();

    info!(
        category = %request.category,
        location = %request.location,
        radius = request.radius,
        "Starting search job"
    );

    let mut summary = SearchSummary::default();
    let mut places = discover(
        discover_request,
        deps.directory.as_ref(),
        deps.cursor_store.as_ref(),
    );

    while let Some(place) = places.next().await {
        let place = place?;
        summary.places_seen += 1;

        let details = match deps.directory.details(&place.place_id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(place_id = %place.place_id, error = %e, "Place details unavailable, skipping");
                summary.leads_skipped += 1;
                continue;
            }
        };

        let candidate = NewLead::from_place(&place, &details, &request.category, radius);
        match record_lead(candidate, deps.lead_store.as_ref(), deps.bus.as_ref()).await {
            Ok((_, true)) => summary.leads_created += 1,
            Ok((_, false)) => summary.leads_skipped += 1,
            Err(RecordError::Store(StoreError::Invalid(reason))) => {
                warn!(place_id = %place.place_id, reason = %reason, "Invalid lead, skipping");
                summary.leads_skipped += 1;
            }
            Err(e) => return Err(DiscoveryError::Store(e.into())),
        }
    }

    info!(
        places_seen = summary.places_seen,
        leads_created = summary.leads_created,
        leads_skipped = summary.leads_skipped,
        "Search job finished"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::messages::{LeadDiscovered, LEADS_EXCHANGE};
    use crate::kernel::test_dependencies::{MockDirectory, TestDependencies};
    use crate::kernel::PlaceDetails;

    fn request() -> StartSearchRequest {
        StartSearchRequest {
            category: "padaria".into(),
            location: "Campinas".into(),
            country: "br".into(),
            radius: 5000,
            max_results: None,
            max_pages: None,
        }
    }

    #[tokio::test]
    async fn test_records_new_places_and_publishes_them() {
        let directory = MockDirectory::new()
            .with_page(&["P1", "P2"], None)
            .with_details(
                "P1",
                PlaceDetails {
                    name: "Padaria Boa Vista".into(),
                    website: Some("https://www.instagram.com/boavista".into()),
                    ..Default::default()
                },
            )
            .with_details(
                "P2",
                PlaceDetails {
                    name: "Padaria Central".into(),
                    ..Default::default()
                },
            );
        let test = TestDependencies::new().with_directory(directory);
        let deps = test.server_deps();

        let summary = start_search(request(), &deps).await.unwrap();
        assert_eq!(
            summary,
            SearchSummary {
                places_seen: 2,
                leads_created: 2,
                leads_skipped: 0
            }
        );

        let published = test.bus.messages_for_exchange(LEADS_EXCHANGE);
        assert_eq!(published.len(), 2);
        let first: LeadDiscovered = test.bus.deserialize_message(&published[0]).unwrap();
        assert_eq!(first.lead.external_id, "P1");
        assert_eq!(first.lead.instagram, "https://www.instagram.com/boavista");
        assert_eq!(first.lead.website, "");
        assert_eq!(first.lead.category, "padaria");
        assert_eq!(first.lead.radius, 5000);
    }

    #[tokio::test]
    async fn test_rediscovery_and_detail_failures_are_skipped() {
        let directory = MockDirectory::new()
            .with_page(&["P1", "P2", "P1"], None)
            .with_details("P1", PlaceDetails::default());
        let test = TestDependencies::new().with_directory(directory);
        let deps = test.server_deps();

        let summary = start_search(request(), &deps).await.unwrap();
        assert_eq!(
            summary,
            SearchSummary {
                places_seen: 3,
                leads_created: 1,
                leads_skipped: 2
            }
        );
        assert_eq!(test.bus.messages_for_exchange(LEADS_EXCHANGE).len(), 1);
    }

    #[tokio::test]
    async fn test_geocode_miss_fails_the_job() {
        let test = TestDependencies::new().with_directory(MockDirectory::new().without_geocode());
        let deps = test.server_deps();

        let err = start_search(request(), &deps).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::GeocodeNotFound(_)));
    }
}
