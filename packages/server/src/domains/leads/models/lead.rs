//! Lead model
//!
//! The canonical business record. Rows are created once from a directory
//! discovery and afterwards only change through single-field patches.

use chrono::{DateTime, NaiveDate, Utc};
use places_client::{PlaceDetails, PlaceResult};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Provenance tag for leads found through the places directory.
pub const SOURCE_GOOGLE_PLACES: &str = "GooglePlaces";

/// Placeholder the directory emits when a place has no summary.
pub const DESCRIPTION_PLACEHOLDER: &str = "no description available";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Lead {
    pub id: Uuid,
    /// Directory place id; unique.
    pub external_id: String,
    pub business_name: String,
    pub registered_name: String,
    pub foundation_date: Option<NaiveDate>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
    pub owner: String,
    pub phone: String,
    pub whatsapp: String,
    pub website: String,
    pub email: String,
    pub instagram: String,
    pub facebook: String,
    pub tiktok: String,
    pub company_registration_id: String,
    pub categories: String,
    pub rating: f64,
    pub user_ratings_total: i32,
    pub price_level: i32,
    pub business_status: String,
    pub vicinity: String,
    pub permanently_closed: bool,
    pub description: String,
    pub primary_activity: String,
    /// Search category the lead was discovered under.
    pub category: String,
    /// Search radius (meters) the lead was discovered with.
    pub radius: i32,
    pub source: String,
    /// Set once the lead has been announced on the bus. A row left `None`
    /// after a failed publish is announced again on its next upsert.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Candidate record built from a directory lookup (or posted to the API).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewLead {
    pub external_id: String,
    pub business_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zip_code: String,
    pub phone: String,
    pub email: String,
    pub website: String,
    pub instagram: String,
    pub facebook: String,
    pub description: Option<String>,
    pub rating: f64,
    pub user_ratings_total: i32,
    pub price_level: i32,
    pub business_status: String,
    pub vicinity: String,
    pub permanently_closed: bool,
    pub categories: String,
    pub category: String,
    pub radius: i32,
    pub source: String,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// True when `text` is exactly the placeholder, ignoring case and spacing.
pub fn is_description_placeholder(text: &str) -> bool {
    collapse_whitespace(text) == DESCRIPTION_PLACEHOLDER
}

/// True for the placeholder as the directory wraps it, e.g.
/// `(Google Places: No description available)`.
fn is_wrapped_placeholder(text: &str) -> bool {
    let collapsed = collapse_whitespace(text);
    let inner = collapsed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .and_then(|rest| rest.split_once(':'))
        .map(|(_, overview)| overview.trim());
    is_description_placeholder(&collapsed) || inner == Some(DESCRIPTION_PLACEHOLDER)
}

impl NewLead {
    /// Build a candidate from a text-search hit and its detail lookup.
    pub fn from_place(place: &PlaceResult, details: &PlaceDetails, category: &str, radius: i32) -> Self {
        let parts = details.address_parts();
        let name = if details.name.is_empty() {
            place.name.clone()
        } else {
            details.name.clone()
        };

        Self {
            external_id: place.place_id.clone(),
            business_name: name,
            address: parts.street,
            city: parts.city,
            state: parts.state,
            country: parts.country,
            zip_code: parts.zip_code,
            phone: details.international_phone_number.clone().unwrap_or_default(),
            website: details.website.clone().unwrap_or_default(),
            description: details
                .overview()
                .map(|overview| format!("(Google Places: {})", overview)),
            rating: details.rating.or(place.rating).unwrap_or_default(),
            user_ratings_total: place.user_ratings_total.unwrap_or_default(),
            price_level: place.price_level.unwrap_or_default(),
            business_status: place.business_status.clone().unwrap_or_default(),
            vicinity: place.vicinity.clone().unwrap_or_default(),
            permanently_closed: place.permanently_closed.unwrap_or(false),
            categories: place.types.join(", "),
            category: category.to_string(),
            radius,
            source: SOURCE_GOOGLE_PLACES.to_string(),
            ..Default::default()
        }
    }

    /// Apply creation-time rules: social profile URLs posing as websites are
    /// moved to their own column and placeholder descriptions are dropped.
    pub fn normalized(mut self) -> Self {
        if self.website.starts_with("https://www.instagram.com") {
            self.instagram = std::mem::take(&mut self.website);
        } else if self.website.starts_with("https://www.facebook.com") {
            self.facebook = std::mem::take(&mut self.website);
        }

        if self
            .description
            .as_deref()
            .is_some_and(|d| d.trim().is_empty() || is_wrapped_placeholder(d))
        {
            self.description = None;
        }

        if self.source.is_empty() {
            self.source = SOURCE_GOOGLE_PLACES.to_string();
        }

        self
    }
}

impl Lead {
    /// Materialize a candidate (used by stores that do not generate rows in SQL).
    pub fn from_new(candidate: NewLead, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: candidate.external_id,
            business_name: candidate.business_name,
            registered_name: String::new(),
            foundation_date: None,
            address: candidate.address,
            city: candidate.city,
            state: candidate.state,
            country: candidate.country,
            zip_code: candidate.zip_code,
            owner: String::new(),
            phone: candidate.phone,
            whatsapp: String::new(),
            website: candidate.website,
            email: candidate.email,
            instagram: candidate.instagram,
            facebook: candidate.facebook,
            tiktok: String::new(),
            company_registration_id: String::new(),
            categories: candidate.categories,
            rating: candidate.rating,
            user_ratings_total: candidate.user_ratings_total,
            price_level: candidate.price_level,
            business_status: candidate.business_status,
            vicinity: candidate.vicinity,
            permanently_closed: candidate.permanently_closed,
            description: candidate.description.unwrap_or_default(),
            primary_activity: String::new(),
            category: candidate.category,
            radius: candidate.radius,
            source: candidate.source,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert a candidate unless its external id is already known.
    ///
    /// Returns `None` when the row already existed; the existing row is
    /// never touched.
    pub async fn insert_if_absent(candidate: &NewLead, pool: &PgPool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO leads (
                id, external_id, business_name, address, city, state, country, zip_code,
                phone, email, website, instagram, facebook, description, rating,
                user_ratings_total, price_level, business_status, vicinity,
                permanently_closed, categories, category, radius, source
             ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24
             )
             ON CONFLICT (external_id) DO NOTHING
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&candidate.external_id)
        .bind(&candidate.business_name)
        .bind(&candidate.address)
        .bind(&candidate.city)
        .bind(&candidate.state)
        .bind(&candidate.country)
        .bind(&candidate.zip_code)
        .bind(&candidate.phone)
        .bind(&candidate.email)
        .bind(&candidate.website)
        .bind(&candidate.instagram)
        .bind(&candidate.facebook)
        .bind(candidate.description.clone().unwrap_or_default())
        .bind(candidate.rating)
        .bind(candidate.user_ratings_total)
        .bind(candidate.price_level)
        .bind(&candidate.business_status)
        .bind(&candidate.vicinity)
        .bind(candidate.permanently_closed)
        .bind(&candidate.categories)
        .bind(&candidate.category)
        .bind(candidate.radius)
        .bind(&candidate.source)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(id: Uuid, pool: &PgPool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM leads WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_external_id(external_id: &str, pool: &PgPool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM leads WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(pool)
            .await
    }

    /// All leads, newest first.
    pub async fn find_all(pool: &PgPool) -> sqlx::Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM leads ORDER BY created_at DESC, id")
            .fetch_all(pool)
            .await
    }

    /// Record the announcement. An earlier timestamp is kept.
    pub async fn mark_published(id: Uuid, pool: &PgPool) -> sqlx::Result<()> {
        sqlx::query("UPDATE leads SET published_at = COALESCE(published_at, NOW()) WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Lock a row for the rest of the transaction.
    pub async fn lock_for_update(
        id: Uuid,
        tx: &mut Transaction<'_, Postgres>,
    ) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM leads WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
    }
}
