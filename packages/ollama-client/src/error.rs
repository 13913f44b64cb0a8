//! Error types for the Ollama client.

use thiserror::Error;

/// Result type for Ollama client operations.
pub type Result<T> = std::result::Result<T, OllamaError>;

/// Ollama client errors.
#[derive(Debug, Error)]
pub enum OllamaError {
    /// Configuration error (invalid base URL, client build failure)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection refused, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Non-2xx response from the inference endpoint
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OllamaError {
    /// Whether retrying the same request may succeed.
    ///
    /// Everything except a malformed response body is transient from the
    /// caller's point of view.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Parse(_) | Self::Config(_))
    }
}
