// Document index implementation over the Elasticsearch document API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::BaseDocumentIndex;

pub struct ElasticsearchIndex {
    client: reqwest::Client,
    base_url: String,
}

impl ElasticsearchIndex {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BaseDocumentIndex for ElasticsearchIndex {
    async fn index(&self, collection: &str, id: &str, document: &serde_json::Value) -> Result<()> {
        let url = format!("{}/{}/_doc/{}", self.base_url, collection, id);
        debug!(url = %url, "Indexing document");

        let response = self
            .client
            .put(&url)
            .query(&[("refresh", "true")])
            .json(document)
            .send()
            .await
            .with_context(|| format!("Failed to reach document index at {}", self.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Document index returned {}: {}", status, body);
        }

        Ok(())
    }
}
