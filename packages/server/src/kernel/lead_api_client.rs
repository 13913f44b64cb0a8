// Lead patch surface reached over HTTP (`PUT /update-lead-field`).
//
// Used by pipeline stages that run outside the API process.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use super::BaseLeadPatcher;
use crate::domains::leads::PatchError;

pub struct LeadApiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct UpdateLeadField<'a> {
    id: Uuid,
    field: &'a str,
    value: serde_json::Value,
}

impl LeadApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BaseLeadPatcher for LeadApiClient {
    async fn patch_field(
        &self,
        lead_id: Uuid,
        field: &str,
        value: serde_json::Value,
    ) -> Result<(), PatchError> {
        let url = format!("{}/update-lead-field", self.base_url);
        debug!(lead_id = %lead_id, field, "Patching lead field");

        let response = self
            .client
            .put(&url)
            .json(&UpdateLeadField {
                id: lead_id,
                field,
                value,
            })
            .send()
            .await
            .map_err(|e| PatchError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(PatchError::NotFound(lead_id)),
            _ => Err(PatchError::Rejected {
                status: status.as_u16(),
                message,
            }),
        }
    }
}
