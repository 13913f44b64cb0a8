//! Persist candidate leads and announce the new ones on the `leads` exchange.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::common::messages::{LeadDiscovered, WireMessage, LEADS_EXCHANGE};
use crate::domains::leads::{Lead, LeadStore, NewLead, StoreError};
use crate::kernel::nats::BroadcastBus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveLeadsSummary {
    pub created: usize,
    pub existing: usize,
    pub invalid: usize,
}

/// Upsert one candidate and announce it unless it was announced before.
///
/// Rediscovering an announced lead is a no-op. A lead whose earlier publish
/// failed is announced by the next call that sees it.
pub async fn record_lead(
    candidate: NewLead,
    store: &dyn LeadStore,
    bus: &dyn BroadcastBus,
) -> Result<(Lead, bool), RecordError> {
    let (lead, created) = store.upsert(candidate).await?;

    if lead.published_at.is_some() {
        debug!(lead_id = %lead.id, external_id = %lead.external_id, "Lead already known");
        return Ok((lead, created));
    }

    let payload = LeadDiscovered::new(lead.clone())
        .to_bytes()
        .context("Failed to encode LeadDiscovered")?;
    bus.publish(LEADS_EXCHANGE, payload)
        .await
        .with_context(|| format!("Failed to publish lead {}", lead.id))?;
    store.mark_published(lead.id).await?;

    if created {
        info!(lead_id = %lead.id, external_id = %lead.external_id, "Lead created and published");
    } else {
        info!(lead_id = %lead.id, external_id = %lead.external_id, "Unannounced lead published");
    }

    Ok((lead, created))
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Publish(#[from] anyhow::Error),
}

/// Record every candidate. Invalid candidates are counted and skipped;
/// store or bus failures abort the batch.
pub async fn save_leads(
    candidates: Vec<NewLead>,
    store: &dyn LeadStore,
    bus: &dyn BroadcastBus,
) -> Result<SaveLeadsSummary, RecordError> {
    let mut summary = SaveLeadsSummary::default();

    for candidate in candidates {
        match record_lead(candidate, store, bus).await {
            Ok((_, true)) => summary.created += 1,
            Ok((_, false)) => summary.existing += 1,
            Err(RecordError::Store(StoreError::Invalid(reason))) => {
                warn!(reason = %reason, "Skipping invalid lead");
                summary.invalid += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}
