// Places directory implementation backed by the Google Places REST client.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use places_client::{PlacesClient, PlacesError};

use super::{BaseDirectory, LatLng, PlaceDetails, SearchPage};

pub struct GooglePlacesDirectory(pub PlacesClient);

impl GooglePlacesDirectory {
    pub fn new(api_key: String, timeout: Duration) -> Self {
        Self(PlacesClient::new(api_key).with_timeout(timeout))
    }
}

#[async_trait]
impl BaseDirectory for GooglePlacesDirectory {
    async fn geocode(&self, address: &str, country: &str) -> Result<Option<LatLng>> {
        match self.0.geocode(address, country).await {
            Ok(location) => Ok(Some(location)),
            Err(PlacesError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn text_search(
        &self,
        query: &str,
        location: LatLng,
        radius_meters: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage> {
        Ok(self
            .0
            .text_search(query, Some(location), radius_meters, page_token)
            .await?)
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails> {
        Ok(self.0.details(place_id).await?)
    }
}
