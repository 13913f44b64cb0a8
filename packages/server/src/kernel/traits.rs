// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Pipeline stages are domain functions that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseSearchService)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub use places_client::{LatLng, PlaceDetails, PlaceResult, SearchPage};

use crate::domains::leads::PatchError;

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a prompt with an LLM (returns raw assistant text)
    async fn complete(&self, prompt: &str) -> Result<String>;
}

// =============================================================================
// Web Search Trait (Infrastructure)
// =============================================================================

/// Ranked web-search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

#[async_trait]
pub trait BaseSearchService: Send + Sync {
    /// General web search
    async fn search(&self, query: &str, max_results: Option<usize>) -> Result<Vec<SearchResult>>;
}

// =============================================================================
// Identifier Search Trait (Infrastructure - SERP scoped to registry ids)
// =============================================================================

/// One organic SERP entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganicResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

#[async_trait]
pub trait BaseIdentifierSearch: Send + Sync {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<OrganicResult>>;
}

// =============================================================================
// Company Registry Trait (Infrastructure)
// =============================================================================

/// A registry entry matched by company name and city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    pub registration_id: String,
    pub city: String,
    /// Scraped detail fields (razaoSocial, nomeFantasia, dataAbertura, ...).
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

#[async_trait]
pub trait BaseRegistry: Send + Sync {
    /// `Ok(None)` when no entry matches the city.
    async fn lookup(&self, company_name: &str, city: &str) -> Result<Option<RegistryRecord>>;
}

// =============================================================================
// Places Directory Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseDirectory: Send + Sync {
    /// `Ok(None)` when the address has no match.
    async fn geocode(&self, address: &str, country: &str) -> Result<Option<LatLng>>;

    /// One page of results. `ZERO_RESULTS` is an empty page, other non-OK
    /// statuses are errors.
    async fn text_search(
        &self,
        query: &str,
        location: LatLng,
        radius_meters: u32,
        page_token: Option<&str>,
    ) -> Result<SearchPage>;

    async fn details(&self, place_id: &str) -> Result<PlaceDetails>;
}

// =============================================================================
// Document Index Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseDocumentIndex: Send + Sync {
    /// Write (or overwrite) one document and make it visible to searches.
    async fn index(&self, collection: &str, id: &str, document: &serde_json::Value) -> Result<()>;
}

// =============================================================================
// Lead Patch Surface Trait
// =============================================================================

#[async_trait]
pub trait BaseLeadPatcher: Send + Sync {
    async fn patch_field(
        &self,
        lead_id: Uuid,
        field: &str,
        value: serde_json::Value,
    ) -> std::result::Result<(), PatchError>;
}
