use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::common::messages::{LeadDiscovered, WireMessage};
use crate::domains::leads::Lead;
use crate::kernel::consumer::{MessageHandler, StageError};
use crate::kernel::BaseDocumentIndex;

pub const COMBINED_LEADS_INDEX: &str = "combined_leads";

/// Lead fields plus `indexed_at`.
pub fn lead_document(lead: &Lead) -> Result<Value, serde_json::Error> {
    let mut document = serde_json::to_value(lead)?;
    if let Value::Object(map) = &mut document {
        map.insert("indexed_at".to_string(), Value::String(Utc::now().to_rfc3339()));
    }
    Ok(document)
}

pub struct IndexingStage {
    index: Arc<dyn BaseDocumentIndex>,
}

impl IndexingStage {
    pub fn new(index: Arc<dyn BaseDocumentIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl MessageHandler for IndexingStage {
    fn name(&self) -> &'static str {
        "indexing"
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), StageError> {
        let message = LeadDiscovered::decode(payload)
            .map_err(|e| StageError::malformed("LeadDiscovered", e))?;
        let lead = message.lead;

        let document =
            lead_document(&lead).map_err(|e| StageError::malformed("lead document", e))?;
        self.index
            .index(COMBINED_LEADS_INDEX, &lead.id.to_string(), &document)
            .await
            .map_err(|e| StageError::retryable("document index", format!("{e:#}")))?;

        info!(lead_id = %lead.id, index = COMBINED_LEADS_INDEX, "Lead indexed");
        Ok(())
    }
}
