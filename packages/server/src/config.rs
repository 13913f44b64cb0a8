use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::domains::discovery::PageDelay;
use crate::domains::extraction::DEFAULT_INFERENCE_TIMEOUT;
use crate::kernel::ai::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};

fn required(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{} must be set", name))
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}

fn nats_url() -> String {
    env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string())
}

/// Lead API and search jobs
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nats_url: String,
    pub port: u16,
    pub google_places_api_key: String,
    pub places_timeout: Duration,
    pub page_delay: PageDelay,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            nats_url: nats_url(),
            port: parsed("PORT", 8080)?,
            google_places_api_key: required("GOOGLE_PLACES_API_KEY")?,
            places_timeout: Duration::from_secs(parsed(
                "PLACES_TIMEOUT_SECS",
                places_client::DEFAULT_TIMEOUT.as_secs(),
            )?),
            page_delay: PageDelay::from_millis(parsed("DISCOVERY_PAGE_DELAY_MS", 2_000)?),
        })
    }
}

/// Enrichment worker
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    pub nats_url: String,
    pub tavily_api_key: String,
    pub serper_api_key: String,
}

impl EnrichmentConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            nats_url: nats_url(),
            tavily_api_key: required("TAVILY_API_KEY")?,
            serper_api_key: required("SERPER_API_KEY")?,
        })
    }
}

/// AI extraction worker
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub nats_url: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub ollama_temperature: f32,
    pub lead_api_url: String,
    pub inference_timeout: Duration,
}

impl ExtractionConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            nats_url: nats_url(),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            ollama_temperature: parsed("OLLAMA_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            lead_api_url: env::var("LEAD_API_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            inference_timeout: Duration::from_secs(parsed(
                "INFERENCE_TIMEOUT_SECS",
                DEFAULT_INFERENCE_TIMEOUT.as_secs(),
            )?),
        })
    }
}

/// Indexing worker
#[derive(Debug, Clone)]
pub struct IndexingConfig {
    pub nats_url: String,
    pub elasticsearch_url: String,
}

impl IndexingConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        Ok(Self {
            nats_url: nats_url(),
            elasticsearch_url: env::var("ELASTICSEARCH_URL")
                .unwrap_or_else(|_| "http://localhost:9200".to_string()),
        })
    }
}
