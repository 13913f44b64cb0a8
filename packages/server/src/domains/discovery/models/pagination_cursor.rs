use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

/// Identifies one search: the same triple always resumes the same cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CursorKey {
    pub query: String,
    pub location: String,
    pub radius: i32,
}

impl CursorKey {
    pub fn new(query: impl Into<String>, location: impl Into<String>, radius: i32) -> Self {
        Self {
            query: query.into(),
            location: location.into(),
            radius,
        }
    }
}

/// Resumable pagination state for one (query, location, radius) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PaginationCursor {
    pub query: String,
    pub location: String,
    pub radius: i32,
    /// Continuation token for the next page; `None` once results ran out.
    pub next_page_token: Option<String>,
    pub pages_fetched: i32,
    pub leads_extracted: i32,
    pub updated_at: DateTime<Utc>,
}

impl PaginationCursor {
    pub fn start(key: &CursorKey) -> Self {
        Self {
            query: key.query.clone(),
            location: key.location.clone(),
            radius: key.radius,
            next_page_token: None,
            pages_fetched: 0,
            leads_extracted: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn key(&self) -> CursorKey {
        CursorKey::new(&self.query, &self.location, self.radius)
    }

    /// Record one consumed page. Counters only grow.
    pub fn advance(&mut self, next_page_token: Option<String>, leads: usize) {
        self.next_page_token = next_page_token.filter(|t| !t.is_empty());
        self.pages_fetched = self.pages_fetched.saturating_add(1);
        self.leads_extracted = self
            .leads_extracted
            .saturating_add(i32::try_from(leads).unwrap_or(i32::MAX));
        self.updated_at = Utc::now();
    }

    pub async fn find(key: &CursorKey, pool: &PgPool) -> sqlx::Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM pagination_cursors WHERE query = $1 AND location = $2 AND radius = $3",
        )
        .bind(&key.query)
        .bind(&key.location)
        .bind(key.radius)
        .fetch_optional(pool)
        .await
    }

    /// Insert or replace the cursor for this triple.
    pub async fn save(&self, pool: &PgPool) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO pagination_cursors
                (query, location, radius, next_page_token, pages_fetched, leads_extracted, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (query, location, radius) DO UPDATE SET
                next_page_token = EXCLUDED.next_page_token,
                pages_fetched = GREATEST(pagination_cursors.pages_fetched, EXCLUDED.pages_fetched),
                leads_extracted = GREATEST(pagination_cursors.leads_extracted, EXCLUDED.leads_extracted),
                updated_at = EXCLUDED.updated_at",
        )
        .bind(&self.query)
        .bind(&self.location)
        .bind(self.radius)
        .bind(&self.next_page_token)
        .bind(self.pages_fetched)
        .bind(self.leads_extracted)
        .bind(self.updated_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
