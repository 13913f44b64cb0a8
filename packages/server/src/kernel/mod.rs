//! Kernel module - infrastructure, external collaborators and dependencies.

pub mod ai;
pub mod consumer;
pub mod deps;
pub mod document_index;
pub mod lead_api_client;
pub mod nats;
pub mod places;
pub mod registry_client;
pub mod serper_client;
pub mod tavily_client;
pub mod test_dependencies;
pub mod traits;

pub use ai::OllamaAI;
pub use consumer::{ConsumerStats, Disposition, MessageHandler, StageConsumer, StageError};
pub use deps::ServerDeps;
pub use document_index::ElasticsearchIndex;
pub use lead_api_client::LeadApiClient;
pub use nats::{BroadcastBus, Delivery, JetStreamBus, PublishedMessage, Subscription, TestBus};
pub use places::GooglePlacesDirectory;
pub use registry_client::CnpjBizRegistry;
pub use serper_client::SerperClient;
pub use tavily_client::TavilyClient;
pub use test_dependencies::TestDependencies;
pub use traits::*;
