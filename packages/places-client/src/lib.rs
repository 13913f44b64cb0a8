//! Pure Google Places / Geocoding REST API client.
//!
//! Covers the three calls a directory search needs: resolving a free-text
//! location to coordinates, paging through text-search results, and fetching
//! the details of a single place.
//!
//! # Example
//!
//! ```rust,ignore
//! use places_client::PlacesClient;
//!
//! let client = PlacesClient::new("your-api-key".into());
//!
//! let center = client.geocode("Campinas", "Brazil").await?;
//! let page = client.text_search("padaria", Some(center), 5000, None).await?;
//! for place in &page.results {
//!     println!("{}", place.name);
//! }
//! ```

pub mod error;
pub mod types;

pub use error::{PlacesError, Result};
pub use types::{
    AddressComponent, AddressParts, EditorialSummary, LatLng, PlaceDetails, PlaceResult,
    SearchPage, ZERO_RESULTS,
};

use std::time::Duration;

use types::{DetailsResponse, GeocodeResponse};

/// Per-request ceiling, covering connect, response and body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Fields requested from the details endpoint.
const DETAIL_FIELDS: &str = "name,formatted_address,international_phone_number,website,rating,address_components,editorial_summary";

pub struct PlacesClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl PlacesClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Point the client at a different host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Resolve an address (city, zip code, ...) to coordinates of the first
    /// match, optionally restricted to a country.
    pub async fn geocode(&self, address: &str, country: &str) -> Result<LatLng> {
        let url = format!("{}/geocode/json", self.base_url);
        let components = format!("country:{}", country);
        let mut params = vec![("address", address)];
        if !country.is_empty() {
            params.push(("components", components.as_str()));
        }

        let resp: GeocodeResponse = self.get_json(&url, &params).await?;
        let query = address.to_string();

        match resp.status.as_str() {
            "OK" => resp
                .results
                .into_iter()
                .next()
                .map(|r| r.geometry.location)
                .ok_or(PlacesError::NotFound(query)),
            ZERO_RESULTS => Err(PlacesError::NotFound(query)),
            _ => Err(PlacesError::Status {
                status: resp.status,
                message: resp.error_message.unwrap_or_default(),
            }),
        }
    }

    /// Fetch one page of text-search results.
    ///
    /// `ZERO_RESULTS` comes back as an empty page; every other non-OK
    /// status is an error.
    pub async fn text_search(
        &self,
        query: &str,
        location: Option<LatLng>,
        radius_meters: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        let url = format!("{}/place/textsearch/json", self.base_url);

        let location_param = location.map(|l| l.to_param());
        let radius_param = radius_meters.to_string();
        let mut params: Vec<(&str, &str)> = vec![("query", query)];
        if let Some(loc) = location_param.as_deref() {
            params.push(("location", loc));
            params.push(("radius", radius_param.as_str()));
        }
        if let Some(token) = page_token {
            params.push(("pagetoken", token));
        }

        let page: SearchPage = self.get_json(&url, &params).await?;
        match page.status.as_str() {
            "OK" | ZERO_RESULTS => {
                tracing::debug!(
                    query,
                    results = page.results.len(),
                    has_next = page.next_page_token.is_some(),
                    "Text search page fetched"
                );
                Ok(page)
            }
            _ => Err(PlacesError::Status {
                status: page.status,
                message: page.error_message.unwrap_or_default(),
            }),
        }
    }

    /// Look up a single place by id.
    pub async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        let url = format!("{}/place/details/json", self.base_url);
        let resp: DetailsResponse = self
            .get_json(&url, &[("place_id", place_id), ("fields", DETAIL_FIELDS)])
            .await?;

        if resp.status != "OK" {
            return Err(PlacesError::Status {
                status: resp.status,
                message: resp.error_message.unwrap_or_default(),
            });
        }

        resp.result
            .ok_or_else(|| PlacesError::NotFound(place_id.to_string()))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.request_error(e, url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), url, "Places API request failed");
            return Err(PlacesError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        resp.json().await.map_err(|e| self.request_error(e, url))
    }

    fn request_error(&self, error: reqwest::Error, url: &str) -> PlacesError {
        if error.is_timeout() {
            tracing::warn!(
                url,
                timeout_ms = self.timeout.as_millis() as u64,
                "Places API request timed out"
            );
            PlacesError::Timeout(self.timeout)
        } else {
            PlacesError::Http(error)
        }
    }
}
