//! Versioned payloads crossing stage boundaries.
//!
//! Decoding ignores unknown fields and a missing `version` reads as 1, so
//! producers can add fields without coordinating consumer upgrades.

use serde::{Deserialize, Serialize};

use crate::domains::enrichment::EnrichmentBundle;
use crate::domains::leads::Lead;

pub const MESSAGE_VERSION: u32 = 1;

/// Exchange carrying newly discovered leads.
pub const LEADS_EXCHANGE: &str = "leads";
/// Exchange carrying enrichment bundles.
pub const LEADS_ENRICHED_EXCHANGE: &str = "leads.enriched";

pub const ENRICHMENT_QUEUE: &str = "enrichment";
pub const INDEXING_QUEUE: &str = "indexing";
pub const EXTRACTION_QUEUE: &str = "extraction";

fn default_version() -> u32 {
    MESSAGE_VERSION
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadDiscovered {
    #[serde(default = "default_version")]
    pub version: u32,
    pub lead: Lead,
}

impl LeadDiscovered {
    pub fn new(lead: Lead) -> Self {
        Self {
            version: MESSAGE_VERSION,
            lead,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadEnriched {
    #[serde(default = "default_version")]
    pub version: u32,
    pub bundle: EnrichmentBundle,
}

impl LeadEnriched {
    pub fn new(bundle: EnrichmentBundle) -> Self {
        Self {
            version: MESSAGE_VERSION,
            bundle,
        }
    }
}

/// JSON wire encoding shared by every message type.
pub trait WireMessage: Serialize + for<'de> Deserialize<'de> {
    fn to_bytes(&self) -> serde_json::Result<bytes::Bytes> {
        serde_json::to_vec(self).map(bytes::Bytes::from)
    }

    fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

impl WireMessage for LeadDiscovered {}
impl WireMessage for LeadEnriched {}
