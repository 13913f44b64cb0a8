//! Model output: cleaning, decoding and the ordered patch plan.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

const FENCE: &str = "```";
const REASONING_MARKER: &str = "<think>";

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response is not a JSON object")]
    NotAnObject,
}

/// Assistant text exactly as returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCompletion(pub String);

impl RawCompletion {
    pub fn parse(&self) -> Result<ExtractionResult, ResponseError> {
        ExtractionResult::parse(&clean_response(&self.0))
    }
}

/// Strip a fenced-block wrapper, drop everything from the reasoning marker
/// onward, then trim stray backticks and whitespace.
pub fn clean_response(text: &str) -> String {
    let mut cleaned = text.trim();

    if let Some(rest) = cleaned.strip_prefix(FENCE) {
        // Language tag runs to the end of the opening line
        let rest = match rest.find('\n') {
            Some(idx) if !rest[..idx].contains('{') => &rest[idx + 1..],
            _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
        };
        cleaned = match rest.rfind(FENCE) {
            Some(idx) => &rest[..idx],
            None => rest,
        };
    }

    if let Some(idx) = cleaned.find(REASONING_MARKER) {
        cleaned = &cleaned[..idx];
    }

    cleaned
        .trim()
        .trim_matches('`')
        .trim()
        .to_string()
}

/// Social channels, in patch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialChannels {
    pub facebook: Option<String>,
    pub instagram: Option<String>,
    pub tiktok: Option<String>,
    pub whatsapp: Option<String>,
}

/// Structured fields decoded from the model. Blank values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    pub registered_name: Option<String>,
    pub registration_id: Option<String>,
    /// Owner and contact details flattened into one line.
    pub owner: Option<String>,
    /// Founding date as returned; normalized when the patch plan is built.
    pub foundation_date: Option<String>,
    pub website: Option<String>,
    pub socials: SocialChannels,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireResult {
    #[serde(rename = "RegisteredName", alias = "RazaoSocial")]
    registered_name: Value,
    #[serde(rename = "CNPJ", alias = "Cnpj", alias = "CompanyRegistrationID")]
    cnpj: Value,
    #[serde(rename = "Contatos", alias = "Contato", alias = "Owner")]
    contatos: Value,
    #[serde(rename = "DataFundacao", alias = "DataDeFundacao", alias = "FoundationDate")]
    data_fundacao: Value,
    #[serde(rename = "Website")]
    website: Value,
    #[serde(rename = "RedesSociais", alias = "SocialMedia")]
    redes_sociais: Value,
}

/// Scalar as trimmed text; blanks, nulls and containers are `None`.
fn text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(text))
}

/// `"Maria Souza, +55 19 93333-4444, maria@x.com"` from either a flat string
/// or `{Nome, Telefone, Email}` (one object or a list of them).
fn flatten_contacts(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            let parts: Vec<String> = [
                field(map, &["Nome", "Name"]),
                field(map, &["Telefone", "Phone"]),
                field(map, &["Email", "E-mail"]),
            ]
            .into_iter()
            .flatten()
            .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        Value::Array(items) => {
            let people: Vec<String> = items.iter().filter_map(flatten_contacts).collect();
            (!people.is_empty()).then(|| people.join("; "))
        }
        other => text(other),
    }
}

impl ExtractionResult {
    /// Decode cleaned model text. Falls back to the outermost `{...}` span
    /// when prose surrounds the object.
    pub fn parse(cleaned: &str) -> Result<Self, ResponseError> {
        let value: Value = match serde_json::from_str(cleaned) {
            Ok(value) => value,
            Err(e) => match (cleaned.find('{'), cleaned.rfind('}')) {
                (Some(start), Some(end)) if start < end => {
                    serde_json::from_str(&cleaned[start..=end])?
                }
                _ => return Err(e.into()),
            },
        };
        if !value.is_object() {
            return Err(ResponseError::NotAnObject);
        }

        let wire: WireResult = serde_json::from_value(value)?;
        let socials = match &wire.redes_sociais {
            Value::Object(map) => SocialChannels {
                facebook: field(map, &["Facebook"]),
                instagram: field(map, &["Instagram"]),
                tiktok: field(map, &["TikTok", "Tiktok"]),
                whatsapp: field(map, &["WhatsApp", "Whatsapp"]),
            },
            _ => SocialChannels::default(),
        };

        Ok(Self {
            registered_name: text(&wire.registered_name),
            registration_id: text(&wire.cnpj),
            owner: flatten_contacts(&wire.contatos),
            foundation_date: text(&wire.data_fundacao),
            website: text(&wire.website),
            socials,
        })
    }

    /// Field patches in their fixed order, blanks skipped. An unparseable
    /// founding date is left out.
    pub fn patch_plan(&self) -> Vec<(&'static str, Value)> {
        let foundation_date = self.foundation_date.as_deref().and_then(|raw| {
            let normalized = normalize_date(raw);
            if normalized.is_none() {
                warn!(date = raw, "Skipping unrecognized foundation date");
            }
            normalized
        });

        let ordered: [(&'static str, Option<String>); 9] = [
            ("RegisteredName", self.registered_name.clone()),
            ("CompanyRegistrationID", self.registration_id.clone()),
            ("Owner", self.owner.clone()),
            ("FoundationDate", foundation_date.map(|d| d.format("%Y-%m-%d").to_string())),
            ("Website", self.website.clone()),
            ("Facebook", self.socials.facebook.clone()),
            ("Instagram", self.socials.instagram.clone()),
            ("TikTok", self.socials.tiktok.clone()),
            ("Whatsapp", self.socials.whatsapp.clone()),
        ];

        ordered
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, Value::String(v))))
            .collect()
    }
}

/// Accepts `YYYY-MM-DD`, `DD/MM/YYYY` and `DD-MM-YYYY`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const VALID: &str = r#"{
        "RegisteredName": "PADARIA BOA VISTA LTDA",
        "CNPJ": "12.345.678/0001-95",
        "Contatos": "Maria Souza",
        "DataFundacao": "15/03/2010",
        "Website": "https://boavista.com.br",
        "RedesSociais": {"Facebook": "", "Instagram": "@boavista", "TikTok": null, "WhatsApp": "+55 19 93333-4444"},
        "AnaliseEmpresa": "Padaria de bairro"
    }"#;

    #[test]
    fn test_clean_strips_fence_and_reasoning() {
        let text = "```json\n{\"CNPJ\": \"12.345.678/0001-95\"}\n<think>maybe the CNPJ is {\"CNPJ\": \"x\"}</think>\n```";
        let cleaned = clean_response(text);
        assert_eq!(cleaned, "{\"CNPJ\": \"12.345.678/0001-95\"}");
        assert!(!cleaned.contains("```"));
        assert!(!cleaned.contains("think"));
    }

    #[test]
    fn test_clean_handles_bare_and_untagged_fences() {
        assert_eq!(clean_response("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(clean_response("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(clean_response("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(clean_response("`{\"a\": 1}`"), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_valid_response() {
        let result = ExtractionResult::parse(VALID).unwrap();
        assert_eq!(result.registered_name.as_deref(), Some("PADARIA BOA VISTA LTDA"));
        assert_eq!(result.owner.as_deref(), Some("Maria Souza"));
        assert_eq!(result.socials.facebook, None);
        assert_eq!(result.socials.tiktok, None);
        assert_eq!(result.socials.whatsapp.as_deref(), Some("+55 19 93333-4444"));
    }

    #[test]
    fn test_nested_contacts_are_flattened() {
        let value = json!({
            "Contatos": {"Nome": "Maria Souza", "Telefone": "", "Email": "maria@boavista.com.br"},
            "DataDeFundacao": "2010-03-15"
        });
        let result = ExtractionResult::parse(&value.to_string()).unwrap();
        assert_eq!(result.owner.as_deref(), Some("Maria Souza, maria@boavista.com.br"));
        assert_eq!(result.foundation_date.as_deref(), Some("2010-03-15"));

        let list = json!({"Contatos": [{"Nome": "Maria"}, {"Nome": "João", "Telefone": "123"}]});
        let result = ExtractionResult::parse(&list.to_string()).unwrap();
        assert_eq!(result.owner.as_deref(), Some("Maria; João, 123"));
    }

    #[test]
    fn test_patch_plan_order_and_normalization() {
        let plan = ExtractionResult::parse(VALID).unwrap().patch_plan();
        let names: Vec<_> = plan.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "RegisteredName",
                "CompanyRegistrationID",
                "Owner",
                "FoundationDate",
                "Website",
                "Instagram",
                "Whatsapp"
            ]
        );
        assert_eq!(plan[3].1, json!("2010-03-15"));
    }

    #[test]
    fn test_unrecognized_date_is_skipped() {
        let result = ExtractionResult {
            foundation_date: Some("março de 2010".into()),
            ..Default::default()
        };
        assert!(result.patch_plan().is_empty());
        assert_eq!(normalize_date("15-03-2010"), NaiveDate::from_ymd_opt(2010, 3, 15));
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            ExtractionResult::parse("I could not find anything"),
            Err(ResponseError::Json(_))
        ));
        assert!(matches!(
            ExtractionResult::parse("[1, 2]"),
            Err(ResponseError::NotAnObject)
        ));
    }

    #[test]
    fn test_prose_around_object_is_tolerated() {
        let result = ExtractionResult::parse("Aqui está: {\"CNPJ\": \"12.345.678/0001-95\"} espero ajudar")
            .unwrap();
        assert_eq!(result.registration_id.as_deref(), Some("12.345.678/0001-95"));
    }

    #[test]
    fn test_raw_completion_pipeline() {
        let raw = RawCompletion(format!("```json\n{}\n```", VALID));
        let result = raw.parse().unwrap();
        assert_eq!(result.registration_id.as_deref(), Some("12.345.678/0001-95"));
    }
}
