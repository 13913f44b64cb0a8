use serde::{Deserialize, Serialize};

/// Status value meaning "query was fine, nothing matched".
pub const ZERO_RESULTS: &str = "ZERO_RESULTS";

/// A resolved coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// `lat,lng` with six decimals, the format the search endpoint expects.
    pub fn to_param(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeResult {
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Geometry {
    pub location: LatLng,
}

/// One entry of a text-search page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceResult {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<i32>,
    #[serde(default)]
    pub price_level: Option<i32>,
    #[serde(default)]
    pub business_status: Option<String>,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub permanently_closed: Option<bool>,
    #[serde(default)]
    pub types: Vec<String>,
}

/// One page of text-search results.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<PlaceResult>,
    pub status: String,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl SearchPage {
    pub fn is_exhausted(&self) -> bool {
        self.status == ZERO_RESULTS || self.results.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DetailsResponse {
    #[serde(default)]
    pub result: Option<PlaceDetails>,
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorialSummary {
    #[serde(default)]
    pub overview: Option<String>,
}

/// Result of a place-details lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceDetails {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub international_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub address_components: Vec<AddressComponent>,
    #[serde(default)]
    pub editorial_summary: Option<EditorialSummary>,
}

/// Address fields flattened out of `address_components`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressParts {
    /// Route, street number and neighbourhood joined by ", ".
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

impl PlaceDetails {
    /// Flatten the component list into the parts a lead record stores.
    ///
    /// City prefers `locality` and falls back to `administrative_area_level_2`;
    /// state uses the short name; the first sublocality wins as neighbourhood.
    pub fn address_parts(&self) -> AddressParts {
        let mut parts = AddressParts::default();
        let mut route = String::new();
        let mut street_number = String::new();
        let mut neighborhood = String::new();
        let mut county = String::new();

        for component in &self.address_components {
            for kind in &component.types {
                match kind.as_str() {
                    "locality" => parts.city = component.long_name.clone(),
                    "administrative_area_level_2" if county.is_empty() => {
                        county = component.long_name.clone()
                    }
                    "administrative_area_level_1" => parts.state = component.short_name.clone(),
                    "postal_code" => parts.zip_code = component.long_name.clone(),
                    "country" => parts.country = component.long_name.clone(),
                    "street_number" => street_number = component.long_name.clone(),
                    "route" => route = component.long_name.clone(),
                    "neighborhood" | "sublocality" | "sublocality_level_1"
                    | "sublocality_level_2"
                        if neighborhood.is_empty() =>
                    {
                        neighborhood = component.long_name.clone()
                    }
                    _ => {}
                }
            }
        }

        if parts.city.is_empty() {
            parts.city = county;
        }

        parts.street = [route, street_number, neighborhood]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        parts
    }

    pub fn overview(&self) -> Option<&str> {
        self.editorial_summary
            .as_ref()
            .and_then(|s| s.overview.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}
