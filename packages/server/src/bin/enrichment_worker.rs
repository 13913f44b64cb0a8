//! Enrichment worker
//!
//! Consumes `LeadDiscovered` from the enrichment queue, queries the three
//! enrichment sources and publishes `LeadEnriched`.

use std::sync::Arc;

use anyhow::{Context, Result};
use leadgen_core::common::{ENRICHMENT_QUEUE, LEADS_ENRICHED_EXCHANGE, LEADS_EXCHANGE};
use leadgen_core::domains::enrichment::{EnrichmentSources, EnrichmentStage};
use leadgen_core::kernel::{
    BroadcastBus, CnpjBizRegistry, JetStreamBus, SerperClient, StageConsumer, TavilyClient,
};
use leadgen_core::EnrichmentConfig;
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

    let config = EnrichmentConfig::from_env().context("Failed to load configuration")?;

    let sources = EnrichmentSources {
        web_search: Arc::new(TavilyClient::new(config.tavily_api_key)?),
        identifier_search: Arc::new(SerperClient::new(config.serper_api_key)?),
        registry: Arc::new(CnpjBizRegistry::new()?),
    };

    let bus = Arc::new(JetStreamBus::connect(&config.nats_url).await?);
    bus.declare_exchange(LEADS_ENRICHED_EXCHANGE).await?;
    bus.declare_queue(LEADS_EXCHANGE, ENRICHMENT_QUEUE).await?;
    let subscription = bus.subscribe(LEADS_EXCHANGE, ENRICHMENT_QUEUE).await?;

    let stage = Arc::new(EnrichmentStage::new(sources, bus.clone()));
    StageConsumer::new(stage, ENRICHMENT_QUEUE)
        .run_until_shutdown(subscription)
        .await?;

    bus.close().await
}
