//! Company registry lookup backed by the public cnpj.biz pages.
//!
//! Two requests per lookup: the name search listing (one line per matching
//! establishment, `"<CNPJ> / <City>"`) and, for the first establishment in the
//! requested city, its detail page. HTML parsing stays in sync helpers since
//! `scraper::Html` is not `Send`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{BaseRegistry, RegistryRecord};

const CNPJ_BIZ_URL: &str = "https://cnpj.biz";

const LISTING_SELECTOR: &str = ".flex.items-center.text-sm.text-gray-500";

/// Label fragments searched in detail-page paragraphs, keyed by output field.
const DETAIL_LABELS: &[(&str, &str)] = &[
    ("cnpj", "CNPJ"),
    ("razaoSocial", "Razão Social"),
    ("nomeFantasia", "Nome Fantasia"),
    ("dataAbertura", "Data de Abertura"),
    ("telefone", "Telefone"),
    ("email", "E-mail"),
];

pub struct CnpjBizRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl CnpjBizRegistry {
    pub fn new() -> Result<Self> {
        // Browser-like User-Agent; the site rejects default client agents
        let user_agent = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/128.0.0.0 Safari/537.36";

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: CNPJ_BIZ_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `{base}/procura/{name}` with the name percent-encoded as one segment.
    fn search_url(&self, company_name: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid registry URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Registry URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push("procura")
            .push(company_name.trim());
        Ok(url)
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Registry returned {} for {}", response.status(), url);
        }

        response.text().await.context("Failed to read registry page")
    }
}

#[async_trait]
impl BaseRegistry for CnpjBizRegistry {
    async fn lookup(&self, company_name: &str, city: &str) -> Result<Option<RegistryRecord>> {
        let search_url = self.search_url(company_name)?;
        debug!(url = %search_url, "Searching company registry");

        let listing = self.fetch_html(search_url.as_str()).await?;
        let Some((registration_id, matched_city)) = find_in_city(&listing, city) else {
            return Ok(None);
        };

        let digits: String = registration_id.chars().filter(char::is_ascii_digit).collect();
        let details_url = format!("{}/{}", self.base_url, digits);

        // Detail page is a bonus; the matched id is still useful without it
        let details = match self.fetch_html(&details_url).await {
            Ok(html) => parse_details(&html),
            Err(e) => {
                warn!(error = %e, registration_id = %registration_id, "Registry detail page unavailable");
                BTreeMap::new()
            }
        };

        Ok(Some(RegistryRecord {
            registration_id,
            city: matched_city,
            details,
        }))
    }
}

/// First listing line whose city contains `city` (case-insensitive).
fn find_in_city(html: &str, city: &str) -> Option<(String, String)> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(LISTING_SELECTOR).ok()?;
    let wanted = city.trim().to_lowercase();

    document.select(&selector).find_map(|element| {
        let text = element.text().collect::<String>();
        let (id, listed_city) = text.trim().rsplit_once(" / ")?;
        let listed_city = listed_city.trim();
        if !wanted.is_empty() && listed_city.to_lowercase().contains(&wanted) {
            Some((id.trim().to_string(), listed_city.to_string()))
        } else {
            None
        }
    })
}

fn parse_details(html: &str) -> BTreeMap<String, String> {
    let document = Html::parse_document(html);
    let mut details = BTreeMap::new();
    let Ok(selector) = Selector::parse("p") else {
        return details;
    };

    let paragraphs: Vec<String> = document
        .select(&selector)
        .map(|p| p.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect();

    for (key, label) in DETAIL_LABELS {
        let needle = label.to_lowercase();
        if let Some(text) = paragraphs.iter().find(|t| t.to_lowercase().contains(&needle)) {
            details.insert(key.to_string(), strip_label(text, label));
        }
    }

    details
}

/// "CNPJ: 12.345.678/0001-95" -> "12.345.678/0001-95"
fn strip_label(text: &str, label: &str) -> String {
    match text.find(':') {
        Some(idx) if text[..idx].to_lowercase().contains(&label.to_lowercase()) => {
            text[idx + 1..].trim().to_string()
        }
        _ => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"
        <html><body>
          <div class="flex items-center text-sm text-gray-500">11.111.111/0001-11 / São Paulo</div>
          <div class="flex items-center text-sm text-gray-500">12.345.678/0001-95 / Campinas</div>
        </body></html>"#;

    const DETAILS: &str = r#"
        <html><body>
          <p>CNPJ: 12.345.678/0001-95</p>
          <p>Razão Social: PADARIA BOA VISTA LTDA</p>
          <p>Nome Fantasia: Padaria Boa Vista</p>
          <p>Data de Abertura: 15/03/2010</p>
          <p>Telefone(s): (19) 3333-4444</p>
        </body></html>"#;

    #[test]
    fn test_find_in_city_is_case_insensitive() {
        let found = find_in_city(LISTING, "campinas").unwrap();
        assert_eq!(found.0, "12.345.678/0001-95");
        assert_eq!(found.1, "Campinas");

        assert!(find_in_city(LISTING, "Recife").is_none());
        assert!(find_in_city(LISTING, "").is_none());
    }

    #[test]
    fn test_parse_details_strips_labels() {
        let details = parse_details(DETAILS);
        assert_eq!(details["cnpj"], "12.345.678/0001-95");
        assert_eq!(details["razaoSocial"], "PADARIA BOA VISTA LTDA");
        assert_eq!(details["dataAbertura"], "15/03/2010");
        assert_eq!(details["telefone"], "(19) 3333-4444");
        assert!(!details.contains_key("email"));
    }

    #[tokio::test]
    async fn test_lookup_fetches_listing_then_details() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/procura/Padaria%20Boa%20Vista"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/12345678000195"))
            .respond_with(ResponseTemplate::new(200).set_body_string(DETAILS))
            .mount(&server)
            .await;

        let registry = CnpjBizRegistry::new().unwrap().with_base_url(server.uri());
        let record = registry
            .lookup("Padaria Boa Vista", "Campinas")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.registration_id, "12.345.678/0001-95");
        assert_eq!(record.details["nomeFantasia"], "Padaria Boa Vista");
    }

    #[tokio::test]
    async fn test_lookup_without_city_match_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let registry = CnpjBizRegistry::new().unwrap().with_base_url(server.uri());
        assert!(registry.lookup("Padaria", "Recife").await.unwrap().is_none());
    }
}
