//! Pure Ollama chat API client
//!
//! A minimal client for a self-hosted Ollama server with no domain-specific
//! logic. Only non-streaming chat is supported.
//!
//! # Example
//!
//! ```rust,ignore
//! use ollama_client::{ChatRequest, Message, OllamaClient};
//!
//! let client = OllamaClient::new("http://localhost:11434");
//!
//! let response = client
//!     .chat(
//!         ChatRequest::new("qwen2.5:14b")
//!             .message(Message::user("Hello!"))
//!             .temperature(0.4),
//!     )
//!     .await?;
//!
//! println!("{}", response.message.content);
//! ```

pub mod error;
pub mod types;

pub use error::{OllamaError, Result};
pub use types::*;

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

/// Default bound for one chat call. Local models routinely need minutes.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// Pure Ollama API client.
#[derive(Clone)]
pub struct OllamaClient {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for the server at `base_url` (e.g. `http://localhost:11434`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create from environment variable `OLLAMA_URL`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("OLLAMA_URL")
            .map_err(|_| OllamaError::Config("OLLAMA_URL not set".into()))?;
        Ok(Self::new(base_url))
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Chat completion.
    ///
    /// Sends the conversation with `stream: false` and waits for the whole
    /// assistant message.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/api/chat", self.base_url))
            .header("Content-Type", "application/json")
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "Ollama request failed");
                if e.is_timeout() {
                    OllamaError::Timeout(self.timeout.as_secs())
                } else {
                    OllamaError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "Ollama API error");
            return Err(OllamaError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::Parse(e.to_string()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            content_length = chat_response.message.content.len(),
            "Ollama chat completion"
        );

        Ok(chat_response)
    }
}
