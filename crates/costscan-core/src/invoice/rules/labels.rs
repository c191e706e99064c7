//! Label-anchored extraction driven by user-configured label lists.
//!
//! Each label is matched case-insensitively, with flexible inner whitespace,
//! and the value is read from what follows it.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::invoice::normalize::transliterate;

use super::amounts::{parse_amount, AmountExtractor};
use super::dates::parse_date;
use super::patterns::{AMOUNT, DATE_TOKEN};
use super::vat::is_valid_rate;
use super::ExtractionMatch;

const LABEL_CONFIDENCE: f32 = 0.9;

/// Gap between a label and its amount; may cross into the next line.
const AMOUNT_GAP: &str = r"[^\d]{0,40}?";
const DATE_GAP: &str = r"[^\d\n]{0,30}?";
const VALUE_PREFIX: &str = r"[^\S\n]*(?:(?:br|broj|no|nr)\b\.?)?[^\S\n]*[:#.\-]?[^\S\n]*";
const VALUE_TOKEN: &str = r"([A-Za-z0-9](?:[A-Za-z0-9/\-_.]*[A-Za-z0-9])?)";
const TEXT_VALUE: &str = r"[^\S\n]*[:\-]?[^\S\n]*([^\n]+)";
const PERCENT_VALUE: &str = r"[^\d\n%]{0,20}?(\d{1,3}(?:[.,]\d{1,2})?)\s*%";

/// Build a case-insensitive pattern for `label` followed by `value`.
pub fn label_pattern(label: &str, value: &str) -> Option<Regex> {
    let label = transliterate(label.trim());
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }

    let starts_word = label.chars().next().is_some_and(char::is_alphanumeric);
    let ends_word = label.chars().last().is_some_and(char::is_alphanumeric);
    let pattern = format!(
        r"(?i){}{}{}{}",
        if starts_word { r"\b" } else { "" },
        words.join(r"\s+"),
        if ends_word { r"\b" } else { "" },
        value
    );

    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            debug!("Skipping label '{}': {}", label, e);
            None
        }
    }
}

/// Amounts following any of the labels, in label priority order.
pub fn label_amounts(text: &str, labels: &[String]) -> Vec<ExtractionMatch<Decimal>> {
    let extractor = AmountExtractor::new();
    let mut results: Vec<ExtractionMatch<Decimal>> = Vec::new();

    for label in labels {
        let Some(pattern) = label_pattern(label, &format!("{}{}", AMOUNT_GAP, AMOUNT)) else {
            continue;
        };
        for caps in pattern.captures_iter(text) {
            let (Some(int_part), Some(dec_part)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let (start, end) = (int_part.start(), dec_part.end());
            if results.iter().any(|m| m.position == Some((start, end))) {
                continue;
            }
            if let Some(amount) = parse_amount(&text[start..end]).filter(|a| extractor.is_plausible(*a)) {
                results.push(
                    ExtractionMatch::new(amount, LABEL_CONFIDENCE, label.as_str())
                        .with_position(start, end),
                );
            }
        }
    }

    results
}

/// Dates following any of the labels.
pub fn label_dates(text: &str, labels: &[String]) -> Vec<ExtractionMatch<NaiveDate>> {
    let mut results: Vec<ExtractionMatch<NaiveDate>> = Vec::new();

    for label in labels {
        let Some(pattern) = label_pattern(label, &format!("{}{}", DATE_GAP, DATE_TOKEN)) else {
            continue;
        };
        for caps in pattern.captures_iter(text) {
            let Some(token) = caps.get(1) else { continue };
            if results.iter().any(|m| m.position == Some((token.start(), token.end()))) {
                continue;
            }
            if let Some(date) = parse_date(token.as_str()) {
                results.push(
                    ExtractionMatch::new(date, LABEL_CONFIDENCE, label.as_str())
                        .with_position(token.start(), token.end()),
                );
            }
        }
    }

    results
}

/// Percentages (such as VAT rates) following any of the labels.
pub fn label_percentages(text: &str, labels: &[String]) -> Vec<ExtractionMatch<Decimal>> {
    let mut results: Vec<ExtractionMatch<Decimal>> = Vec::new();

    for label in labels {
        let Some(pattern) = label_pattern(label, PERCENT_VALUE) else {
            continue;
        };
        for caps in pattern.captures_iter(text) {
            let Some(token) = caps.get(1) else { continue };
            if results.iter().any(|m| m.position == Some((token.start(), token.end()))) {
                continue;
            }
            if let Some(rate) = parse_amount(token.as_str()).filter(|r| is_valid_rate(*r)) {
                results.push(
                    ExtractionMatch::new(rate, LABEL_CONFIDENCE, label.as_str())
                        .with_position(token.start(), token.end()),
                );
            }
        }
    }

    results
}

/// Rest of the line after any of the labels.
pub fn label_text(text: &str, labels: &[String]) -> Vec<ExtractionMatch<String>> {
    collect_values(text, labels, TEXT_VALUE)
}

/// Single alphanumeric token after any of the labels (numbers, codes, currency).
pub fn label_values(text: &str, labels: &[String]) -> Vec<ExtractionMatch<String>> {
    collect_values(text, labels, &format!("{}{}", VALUE_PREFIX, VALUE_TOKEN))
}

fn collect_values(text: &str, labels: &[String], value: &str) -> Vec<ExtractionMatch<String>> {
    let mut results = Vec::new();

    for label in labels {
        let Some(pattern) = label_pattern(label, value) else {
            continue;
        };
        for caps in pattern.captures_iter(text) {
            let Some(token) = caps.get(1) else { continue };
            let value = token.as_str().trim();
            if value.is_empty() {
                continue;
            }
            results.push(
                ExtractionMatch::new(value.to_string(), LABEL_CONFIDENCE, label.as_str())
                    .with_position(token.start(), token.end()),
            );
        }
    }

    results
}
