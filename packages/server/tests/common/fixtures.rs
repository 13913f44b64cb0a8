//! Test fixtures for creating test data.

#![allow(dead_code)]

use leadgen_core::domains::leads::NewLead;
use leadgen_core::kernel::test_dependencies::{MockDirectory, MockIdentifierSearch, MockSearchService};
use leadgen_core::kernel::{OrganicResult, PlaceDetails, SearchResult};
use places_client::AddressComponent;

/// Extraction answer shaped like a real model reply (fenced, with aliases).
pub const EXTRACTION_RESPONSE: &str = "```json\n{\"RegisteredName\": \"PADARIA BOA VISTA LTDA\", \"CNPJ\": \"12.345.678/0001-95\", \"Contatos\": \"Maria Souza\", \"DataFundacao\": \"15/03/2010\", \"Website\": \"https://boavista.com.br\"}\n```";

fn component(long_name: &str, short_name: &str, kind: &str) -> AddressComponent {
    AddressComponent {
        long_name: long_name.to_string(),
        short_name: short_name.to_string(),
        types: vec![kind.to_string()],
    }
}

/// Place details for a business in Campinas, SP.
pub fn campinas_details(name: &str, website: Option<&str>) -> PlaceDetails {
    PlaceDetails {
        name: name.to_string(),
        formatted_address: Some("Rua das Flores, 100 - Centro, Campinas - SP".to_string()),
        international_phone_number: Some("+55 19 3232-0000".to_string()),
        website: website.map(str::to_string),
        rating: Some(4.7),
        address_components: vec![
            component("100", "100", "street_number"),
            component("Rua das Flores", "R. das Flores", "route"),
            component("Centro", "Centro", "sublocality"),
            component("Campinas", "Campinas", "locality"),
            component("São Paulo", "SP", "administrative_area_level_1"),
            component("Brazil", "BR", "country"),
            component("13010-000", "13010-000", "postal_code"),
        ],
        editorial_summary: None,
    }
}

/// Directory with a single page of two bakeries.
pub fn bakery_directory() -> MockDirectory {
    MockDirectory::new()
        .with_page(&["P1", "P2"], None)
        .with_details("P1", campinas_details("Padaria Boa Vista", Some("https://boavista.com.br")))
        .with_details("P2", campinas_details("Padaria Pão Quente", None))
}

pub fn new_lead(external_id: &str, name: &str) -> NewLead {
    NewLead {
        external_id: external_id.to_string(),
        business_name: name.to_string(),
        city: "Campinas".to_string(),
        state: "SP".to_string(),
        country: "Brazil".to_string(),
        ..Default::default()
    }
}

pub fn web_search() -> MockSearchService {
    MockSearchService::new().with_results(vec![SearchResult {
        title: "Padaria Boa Vista - Campinas".to_string(),
        url: "https://boavista.com.br/contato".to_string(),
        content: "CNPJ 12.345.678/0001-95, contato@boavista.com.br, (19) 3232-0000".to_string(),
        score: 0.92,
        published_date: None,
    }])
}

pub fn identifier_search() -> MockIdentifierSearch {
    MockIdentifierSearch::new().with_results(vec![OrganicResult {
        title: "PADARIA BOA VISTA LTDA - CNPJ 12.345.678/0001-95".to_string(),
        snippet: "Padaria Boa Vista, Campinas - SP. CNPJ 12.345.678/0001-95".to_string(),
        link: "https://cnpj.biz/12345678000195".to_string(),
    }])
}
