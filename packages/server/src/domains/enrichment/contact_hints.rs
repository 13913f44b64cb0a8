//! First identifier, phone, email and website found in web-search results.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::kernel::SearchResult;

lazy_static! {
    static ref CNPJ: Regex = Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}").unwrap();
    static ref PHONE: Regex = Regex::new(r"\+\d{2}\s?\d{2,3}\s?\d{4,5}-\d{4}").unwrap();
    static ref EMAIL: Regex =
        Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cnpj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl ContactHints {
    pub fn is_empty(&self) -> bool {
        self.cnpj.is_none() && self.phone.is_none() && self.email.is_none() && self.website.is_none()
    }
}

fn first_match(re: &Regex, results: &[SearchResult]) -> Option<String> {
    results
        .iter()
        .find_map(|r| re.find(&r.content).map(|m| m.as_str().to_string()))
}

pub fn contact_hints(results: &[SearchResult]) -> ContactHints {
    ContactHints {
        cnpj: first_match(&CNPJ, results),
        phone: first_match(&PHONE, results),
        email: first_match(&EMAIL, results),
        website: results
            .iter()
            .map(|r| r.url.as_str())
            .find(|url| url.starts_with("http://") || url.starts_with("https://"))
            .map(str::to_string),
    }
}
