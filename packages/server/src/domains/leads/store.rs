//! Lead persistence behind one trait: Postgres for deployments, in-memory
//! for tests and local runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::models::{Lead, NewLead};
use super::patch::{FieldValue, LeadField, PatchError};
use crate::kernel::BaseLeadPatcher;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid lead: {0}")]
    Invalid(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Insert unless the external id is known. Returns the stored row and
    /// whether it was created by this call. Existing rows are never merged.
    async fn upsert(&self, candidate: NewLead) -> Result<(Lead, bool), StoreError>;

    /// Validate and apply one field patch atomically.
    async fn patch_field(&self, id: Uuid, field: &str, value: &Value) -> Result<(), PatchError>;

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError>;

    /// All leads, newest first.
    async fn list(&self) -> Result<Vec<Lead>, StoreError>;

    /// Record that the lead has been announced on the bus.
    async fn mark_published(&self, id: Uuid) -> Result<(), StoreError>;

    /// Cheap liveness probe for health checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

fn check_candidate(candidate: NewLead) -> Result<NewLead, StoreError> {
    if candidate.external_id.trim().is_empty() {
        return Err(StoreError::Invalid("external_id is required".to_string()));
    }
    Ok(candidate.normalized())
}

// =============================================================================
// Postgres
// =============================================================================

pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn upsert(&self, candidate: NewLead) -> Result<(Lead, bool), StoreError> {
        let candidate = check_candidate(candidate)?;

        if let Some(lead) = Lead::insert_if_absent(&candidate, &self.pool).await? {
            return Ok((lead, true));
        }

        // Lost the insert: the row exists (possibly from a concurrent job).
        let existing = Lead::find_by_external_id(&candidate.external_id, &self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        debug!(external_id = %candidate.external_id, "lead already known");
        Ok((existing, false))
    }

    async fn patch_field(&self, id: Uuid, field: &str, value: &Value) -> Result<(), PatchError> {
        let field = LeadField::parse(field)?;
        let value = FieldValue::coerce(field, value)?;

        let mut tx = self.pool.begin().await?;
        let mut lead = Lead::lock_for_update(id, &mut tx)
            .await?
            .ok_or(PatchError::NotFound(id))?;

        if !lead.apply_patch(field, value)? {
            tx.commit().await?;
            return Ok(());
        }

        let sql = format!(
            "UPDATE leads SET {} = $2, updated_at = NOW() WHERE id = $1",
            field.column()
        );
        let query = sqlx::query(&sql).bind(id);
        let query = match lead.field_value(field) {
            Some(FieldValue::Text(v)) => query.bind(v),
            Some(FieldValue::Integer(v)) => query.bind(v),
            Some(FieldValue::Float(v)) => query.bind(v),
            Some(FieldValue::Bool(v)) => query.bind(v),
            Some(FieldValue::Date(v)) => query.bind(v),
            None => query.bind(Option::<chrono::NaiveDate>::None),
        };
        query.execute(&mut *tx).await?;
        tx.commit().await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        Ok(Lead::find_by_id(id, &self.pool).await?)
    }

    async fn list(&self) -> Result<Vec<Lead>, StoreError> {
        Ok(Lead::find_all(&self.pool).await?)
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), StoreError> {
        Ok(Lead::mark_published(id, &self.pool).await?)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
struct Rows {
    by_id: HashMap<Uuid, Lead>,
    by_external_id: HashMap<String, Uuid>,
}

/// Process-local store. Every operation holds the write lock for its whole
/// duration, which gives the same single-record atomicity as the SQL store.
#[derive(Default)]
pub struct InMemoryLeadStore {
    rows: RwLock<Rows>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn upsert(&self, candidate: NewLead) -> Result<(Lead, bool), StoreError> {
        let candidate = check_candidate(candidate)?;
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = rows
            .by_external_id
            .get(&candidate.external_id)
            .and_then(|id| rows.by_id.get(id))
        {
            return Ok((existing.clone(), false));
        }

        let lead = Lead::from_new(candidate, Utc::now());
        rows.by_external_id.insert(lead.external_id.clone(), lead.id);
        rows.by_id.insert(lead.id, lead.clone());
        Ok((lead, true))
    }

    async fn patch_field(&self, id: Uuid, field: &str, value: &Value) -> Result<(), PatchError> {
        let field = LeadField::parse(field)?;
        let value = FieldValue::coerce(field, value)?;

        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        let lead = rows.by_id.get_mut(&id).ok_or(PatchError::NotFound(id))?;
        if lead.apply_patch(field, value)? {
            lead.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        Ok(self
            .rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .by_id
            .get(&id)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Lead>, StoreError> {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        let mut leads: Vec<Lead> = rows.by_id.values().cloned().collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(leads)
    }

    async fn mark_published(&self, id: Uuid) -> Result<(), StoreError> {
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        if let Some(lead) = rows.by_id.get_mut(&id) {
            lead.published_at.get_or_insert_with(Utc::now);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// =============================================================================
// In-process patcher
// =============================================================================

/// Patches a store directly instead of going through the HTTP surface.
pub struct StoreLeadPatcher {
    store: Arc<dyn LeadStore>,
}

impl StoreLeadPatcher {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BaseLeadPatcher for StoreLeadPatcher {
    async fn patch_field(&self, lead_id: Uuid, field: &str, value: Value) -> Result<(), PatchError> {
        self.store.patch_field(lead_id, field, &value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidate(external_id: &str, name: &str) -> NewLead {
        NewLead {
            external_id: external_id.to_string(),
            business_name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let store = InMemoryLeadStore::new();

        let (first, created) = store.upsert(candidate("p1", "Padaria")).await.unwrap();
        assert!(created);

        let (second, created) = store.upsert(candidate("p1", "Renamed")).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.business_name, "Padaria");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_requires_external_id() {
        let store = InMemoryLeadStore::new();
        let err = store.upsert(candidate("  ", "Padaria")).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_patch_unknown_lead_is_not_found() {
        let store = InMemoryLeadStore::new();
        let id = Uuid::new_v4();
        let err = store
            .patch_field(id, "Owner", &json!("Maria"))
            .await
            .unwrap_err();
        assert!(matches!(err, PatchError::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_patch_description_appends_and_skips_placeholder() {
        let store = InMemoryLeadStore::new();
        let (lead, _) = store.upsert(candidate("p1", "Padaria")).await.unwrap();

        store.patch_field(lead.id, "Description", &json!("A")).await.unwrap();
        store.patch_field(lead.id, "description", &json!("B")).await.unwrap();
        store
            .patch_field(lead.id, "Description", &json!("no description available"))
            .await
            .unwrap();

        let lead = store.get(lead.id).await.unwrap().unwrap();
        assert_eq!(lead.description, "A\nB");
    }

    #[tokio::test]
    async fn test_patch_rejects_unknown_field_and_bad_type() {
        let store = InMemoryLeadStore::new();
        let (lead, _) = store.upsert(candidate("p1", "Padaria")).await.unwrap();

        assert!(matches!(
            store.patch_field(lead.id, "external_id", &json!("x")).await,
            Err(PatchError::UnknownField(_))
        ));
        assert!(matches!(
            store.patch_field(lead.id, "Rating", &json!("five")).await,
            Err(PatchError::TypeMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_patcher_delegates() {
        let store = Arc::new(InMemoryLeadStore::new());
        let (lead, _) = store.upsert(candidate("p1", "Padaria")).await.unwrap();

        let patcher = StoreLeadPatcher::new(store.clone());
        patcher
            .patch_field(lead.id, "FoundationDate", json!("1999-12-31"))
            .await
            .unwrap();

        let lead = store.get(lead.id).await.unwrap().unwrap();
        assert_eq!(
            lead.foundation_date,
            chrono::NaiveDate::from_ymd_opt(1999, 12, 31)
        );
    }
}
