use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{BaseIdentifierSearch, OrganicResult};

const SERPER_URL: &str = "https://google.serper.dev/search";

/// Serper (Google SERP) client, localized for Brazilian results.
pub struct SerperClient {
    api_key: String,
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    gl: &'static str,
    hl: &'static str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

impl SerperClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            client,
            url: SERPER_URL.to_string(),
        })
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl BaseIdentifierSearch for SerperClient {
    async fn search(&self, query: &str, num_results: usize) -> Result<Vec<OrganicResult>> {
        let request = SerperRequest {
            q: query,
            gl: "br",
            hl: "pt-br",
            num: num_results,
        };

        let response = self
            .client
            .post(&self.url)
            .header("X-API-KEY", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send Serper search request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Serper API error {}: {}", status, body);
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .context("Failed to parse Serper response")?;

        Ok(parsed.organic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_posts_localized_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "serper-key"))
            .and(body_json(json!({
                "q": "Padaria, Campinas CNPJ",
                "gl": "br",
                "hl": "pt-br",
                "num": 10
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "organic": [
                    {"title": "Padaria LTDA", "snippet": "CNPJ 12.345.678/0001-95", "link": "https://cnpj.biz/12345678000195", "position": 1}
                ]
            })))
            .mount(&server)
            .await;

        let client = SerperClient::new("serper-key".into()).unwrap().with_url(server.uri());
        let results = client.search("Padaria, Campinas CNPJ", 10).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].link, "https://cnpj.biz/12345678000195");
    }

    #[tokio::test]
    async fn test_missing_organic_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = SerperClient::new("k".into()).unwrap().with_url(server.uri());
        assert!(client.search("q", 5).await.unwrap().is_empty());
    }
}
