//! CNPJ candidates mined from search results.
//!
//! Matches come from two patterns (punctuated and bare 14 digits) over the
//! title, snippet and link of every result. Each occurrence adds to its
//! identifier's score; an occurrence in a result that mentions the expected
//! company name earns a bonus on top of the base point.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::kernel::OrganicResult;

const CNPJ_DIGITS: usize = 14;
const BASE_SCORE: u32 = 1;
const NAME_MATCH_BONUS: u32 = 5;

lazy_static! {
    static ref PUNCTUATED: Regex = Regex::new(r"\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}").unwrap();
    static ref BARE: Regex = Regex::new(r"\b\d{14}\b").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateIdentifier {
    /// Canonical `XX.XXX.XXX/XXXX-XX` form.
    pub identifier: String,
    pub score: u32,
}

/// Canonical punctuated form, or `None` unless the input holds exactly 14 digits.
pub fn normalize(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != CNPJ_DIGITS {
        return None;
    }
    Some(format!(
        "{}.{}.{}/{}-{}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..14]
    ))
}

/// Distinct identifiers found in `results`, highest score first. Ties keep
/// the order in which identifiers were first seen.
pub fn extract(results: &[OrganicResult], expected_name: &str) -> Vec<CandidateIdentifier> {
    let expected = expected_name.trim().to_lowercase();
    let mut ranked: Vec<CandidateIdentifier> = Vec::new();

    for result in results {
        let mentions_name = !expected.is_empty()
            && (result.title.to_lowercase().contains(&expected)
                || result.snippet.to_lowercase().contains(&expected));
        let points = if mentions_name {
            BASE_SCORE + NAME_MATCH_BONUS
        } else {
            BASE_SCORE
        };

        for field in [&result.title, &result.snippet, &result.link] {
            let matches = PUNCTUATED
                .find_iter(field)
                .chain(BARE.find_iter(field))
                .filter_map(|m| normalize(m.as_str()));

            for identifier in matches {
                match ranked.iter_mut().find(|c| c.identifier == identifier) {
                    Some(candidate) => candidate.score += points,
                    None => ranked.push(CandidateIdentifier {
                        identifier,
                        score: points,
                    }),
                }
            }
        }
    }

    // sort_by is stable
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, snippet: &str, link: &str) -> OrganicResult {
        OrganicResult {
            title: title.to_string(),
            snippet: snippet.to_string(),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_normalize_bare_and_punctuated_agree() {
        assert_eq!(
            normalize("12345678000195").as_deref(),
            Some("12.345.678/0001-95")
        );
        assert_eq!(
            normalize("12.345.678/0001-95").as_deref(),
            Some("12.345.678/0001-95")
        );
        assert_eq!(normalize("1234567800019"), None);
        assert_eq!(normalize("123456780001950"), None);
    }

    #[test]
    fn test_name_match_outscores_plain_match_by_five() {
        let results = vec![
            result("Outra empresa", "CNPJ 11.111.111/0001-11", ""),
            result("Padaria Boa Vista LTDA", "CNPJ 22.222.222/0001-22", ""),
        ];

        let ranked = extract(&results, "padaria boa vista");
        assert_eq!(ranked[0].identifier, "22.222.222/0001-22");
        assert_eq!(ranked[1].identifier, "11.111.111/0001-11");
        assert!(ranked[0].score >= ranked[1].score + 5);
    }

    #[test]
    fn test_same_identifier_merges_across_forms() {
        let results = vec![
            result("", "CNPJ 12.345.678/0001-95", "https://cnpj.biz/12345678000195"),
            result("", "outro 98.765.432/0001-10", ""),
        ];

        let ranked = extract(&results, "");
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].identifier, "12.345.678/0001-95");
        assert_eq!(ranked[0].score, 2);
        assert_eq!(ranked[1].score, 1);
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let results = vec![
            result("", "33.333.333/0001-33", ""),
            result("", "11.111.111/0001-11", ""),
            result("", "22.222.222/0001-22", ""),
        ];

        let ids: Vec<_> = extract(&results, "")
            .into_iter()
            .map(|c| c.identifier)
            .collect();
        assert_eq!(
            ids,
            vec!["33.333.333/0001-33", "11.111.111/0001-11", "22.222.222/0001-22"]
        );
    }

    #[test]
    fn test_short_digit_runs_are_ignored() {
        let results = vec![result("", "telefone 1934567890123", "")];
        assert!(extract(&results, "").is_empty());
    }
}
