//! Indexing worker
//!
//! Consumes `LeadDiscovered` from its own queue and writes each lead into
//! the `combined_leads` document index.

use std::sync::Arc;

use anyhow::{Context, Result};
use leadgen_core::common::{INDEXING_QUEUE, LEADS_EXCHANGE};
use leadgen_core::domains::indexing::IndexingStage;
use leadgen_core::kernel::{BroadcastBus, ElasticsearchIndex, JetStreamBus, StageConsumer};
use leadgen_core::IndexingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leadgen_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = IndexingConfig::from_env().context("Failed to load configuration")?;
    let index = ElasticsearchIndex::new(config.elasticsearch_url)?;

    let bus = JetStreamBus::connect(&config.nats_url).await?;
    bus.declare_queue(LEADS_EXCHANGE, INDEXING_QUEUE).await?;
    let subscription = bus.subscribe(LEADS_EXCHANGE, INDEXING_QUEUE).await?;

    let stage = Arc::new(IndexingStage::new(Arc::new(index)));
    StageConsumer::new(stage, INDEXING_QUEUE)
        .run_until_shutdown(subscription)
        .await?;

    bus.close().await
}
