//! Enrichment stage: `LeadDiscovered` in, `LeadEnriched` out.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::activities::{enrich, EnrichmentSources};
use crate::common::messages::{LeadDiscovered, LeadEnriched, WireMessage, LEADS_ENRICHED_EXCHANGE};
use crate::kernel::consumer::{MessageHandler, StageError};
use crate::kernel::nats::BroadcastBus;

pub struct EnrichmentStage {
    sources: EnrichmentSources,
    bus: Arc<dyn BroadcastBus>,
}

impl EnrichmentStage {
    pub fn new(sources: EnrichmentSources, bus: Arc<dyn BroadcastBus>) -> Self {
        Self { sources, bus }
    }
}

#[async_trait]
impl MessageHandler for EnrichmentStage {
    fn name(&self) -> &'static str {
        "enrichment"
    }

    async fn handle(&self, payload: &[u8]) -> Result<(), StageError> {
        let message = LeadDiscovered::decode(payload)
            .map_err(|e| StageError::malformed("LeadDiscovered", e))?;
        let lead = message.lead;

        if lead.business_name.trim().is_empty() {
            return Err(StageError::Malformed(format!(
                "lead {} has no business name",
                lead.id
            )));
        }

        let lead_id = lead.id;
        let bundle = enrich(lead, &self.sources).await;

        let payload = LeadEnriched::new(bundle)
            .to_bytes()
            .map_err(|e| StageError::malformed("LeadEnriched", e))?;
        self.bus
            .publish(LEADS_ENRICHED_EXCHANGE, payload)
            .await
            .map_err(|e| StageError::retryable("publish LeadEnriched", e))?;

        info!(lead_id = %lead_id, "Enrichment bundle published");
        Ok(())
    }
}
