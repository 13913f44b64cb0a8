//! AI extraction worker
//!
//! Consumes `LeadEnriched`, asks the inference endpoint for a structured
//! profile and patches the lead one field at a time.

use std::sync::Arc;

use anyhow::{Context, Result};
use leadgen_core::common::{EXTRACTION_QUEUE, LEADS_ENRICHED_EXCHANGE};
use leadgen_core::domains::extraction::{ExtractionStage, SYSTEM_PROMPT};
use leadgen_core::kernel::{BroadcastBus, JetStreamBus, LeadApiClient, OllamaAI, StageConsumer};
use leadgen_core::ExtractionConfig;
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

    let config = ExtractionConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(model = %config.ollama_model, url = %config.ollama_url, "Using inference endpoint");

    let ai = OllamaAI::new(config.ollama_url, config.ollama_model)
        .with_temperature(config.ollama_temperature)
        .with_timeout(config.inference_timeout)
        .with_system_prompt(SYSTEM_PROMPT);
    let patcher = LeadApiClient::new(config.lead_api_url)?;

    let bus = JetStreamBus::connect(&config.nats_url).await?;
    bus.declare_queue(LEADS_ENRICHED_EXCHANGE, EXTRACTION_QUEUE).await?;
    let subscription = bus.subscribe(LEADS_ENRICHED_EXCHANGE, EXTRACTION_QUEUE).await?;

    let stage = Arc::new(
        ExtractionStage::new(Arc::new(ai), Arc::new(patcher))
            .with_timeout(config.inference_timeout),
    );
    StageConsumer::new(stage, EXTRACTION_QUEUE)
        .run_until_shutdown(subscription)
        .await?;

    bus.close().await
}
