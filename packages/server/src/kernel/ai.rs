// AI implementation using a self-hosted Ollama server
//
// This is the infrastructure implementation of BaseAI.
// Business logic (what to prompt for) lives in domain layers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ollama_client::{ChatRequest, Message, OllamaClient};
use std::time::Duration;
use tracing::debug;

use super::BaseAI;

pub const DEFAULT_MODEL: &str = "qwen2.5:14b";
pub const DEFAULT_TEMPERATURE: f32 = 0.4;

/// Ollama implementation of AI capabilities
#[derive(Clone)]
pub struct OllamaAI {
    client: OllamaClient,
    model: String,
    temperature: f32,
    system_prompt: Option<String>,
}

impl OllamaAI {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OllamaClient::new(base_url),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    /// System message sent ahead of every prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }
}

#[async_trait]
impl BaseAI for OllamaAI {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let mut request = ChatRequest::new(&self.model).temperature(self.temperature);
        if let Some(system) = &self.system_prompt {
            request = request.message(Message::system(system.clone()));
        }
        request = request.message(Message::user(prompt));

        debug!(model = %self.model, prompt_len = prompt.len(), "Sending chat request");

        let response = self
            .client
            .chat(request)
            .await
            .with_context(|| format!("Ollama chat with {} failed", self.model))?;

        Ok(response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_complete_sends_system_then_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "qwen2.5:14b",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "be terse"},
                    {"role": "user", "content": "hello"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "qwen2.5:14b",
                "message": {"role": "assistant", "content": "{\"CNPJ\": \"\"}"},
                "done": true
            })))
            .mount(&server)
            .await;

        let ai = OllamaAI::new(server.uri(), DEFAULT_MODEL).with_system_prompt("be terse");
        let text = ai.complete("hello").await.unwrap();
        assert_eq!(text, "{\"CNPJ\": \"\"}");
    }

    #[tokio::test]
    async fn test_complete_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
            .mount(&server)
            .await;

        let ai = OllamaAI::new(server.uri(), DEFAULT_MODEL);
        assert!(ai.complete("hello").await.is_err());
    }
}
