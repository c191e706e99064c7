//! Amount extraction for cost documents.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{AMOUNT_PATTERN, AMOUNT_WITH_CURRENCY, CURRENCY_BEFORE_AMOUNT, TOTAL_LABELED};
use super::{ExtractionMatch, FieldExtractor};

/// Confidence of an amount next to a total keyword.
const LABELED_CONFIDENCE: f32 = 0.95;
/// Confidence of an amount next to a currency token.
const CURRENCY_CONFIDENCE: f32 = 0.9;
/// Confidence of a bare decimal.
const BARE_CONFIDENCE: f32 = 0.6;

/// Amount field extractor.
pub struct AmountExtractor {
    max_amount: Decimal,
}

impl AmountExtractor {
    pub fn new() -> Self {
        Self {
            max_amount: Decimal::new(1_000_000, 0),
        }
    }

    /// Amounts at or above `max_amount` are rejected as implausible.
    pub fn with_max_amount(mut self, max_amount: Decimal) -> Self {
        self.max_amount = max_amount;
        self
    }

    pub fn is_plausible(&self, amount: Decimal) -> bool {
        amount > Decimal::ZERO && amount < self.max_amount
    }

    fn collect(
        &self,
        text: &str,
        caps: regex::Captures<'_>,
        confidence: f32,
        results: &mut Vec<ExtractionMatch<Decimal>>,
    ) {
        let (Some(int_part), Some(dec_part)) = (caps.get(1), caps.get(2)) else {
            return;
        };
        let (start, end) = (int_part.start(), dec_part.end());
        if embedded_in_date(text, start, end) {
            return;
        }

        let Some(amount) = parse_amount(&text[start..end]) else {
            return;
        };
        if !self.is_plausible(amount) {
            return;
        }

        if let Some(existing) = results.iter_mut().find(|m| m.position == Some((start, end))) {
            if confidence > existing.confidence {
                existing.confidence = confidence;
                existing.source = caps[0].to_string();
            }
            return;
        }

        results.push(ExtractionMatch::new(amount, confidence, &caps[0]).with_position(start, end));
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    /// The most trustworthy amount; the largest one wins among equals.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().max_by(|a, b| {
            a.confidence
                .total_cmp(&b.confidence)
                .then_with(|| a.value.cmp(&b.value))
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for caps in TOTAL_LABELED.captures_iter(text) {
            self.collect(text, caps, LABELED_CONFIDENCE, &mut results);
        }
        for caps in AMOUNT_WITH_CURRENCY.captures_iter(text) {
            self.collect(text, caps, CURRENCY_CONFIDENCE, &mut results);
        }
        for caps in CURRENCY_BEFORE_AMOUNT.captures_iter(text) {
            self.collect(text, caps, CURRENCY_CONFIDENCE, &mut results);
        }
        for caps in AMOUNT_PATTERN.captures_iter(text) {
            self.collect(text, caps, BARE_CONFIDENCE, &mut results);
        }

        results.sort_by_key(|m| m.position);
        results
    }
}

/// Amounts found on a document.
#[derive(Debug, Clone, Default)]
pub struct DocumentAmounts {
    /// Best total candidate.
    pub total: Option<ExtractionMatch<Decimal>>,
    /// All plausible amounts in text order.
    pub all_amounts: Vec<ExtractionMatch<Decimal>>,
}

/// Extract amounts from document text.
pub fn extract_amounts(text: &str) -> DocumentAmounts {
    let extractor = AmountExtractor::new();
    let all_amounts = extractor.extract_all(text);
    let total = all_amounts
        .iter()
        .max_by(|a, b| {
            a.confidence
                .total_cmp(&b.confidence)
                .then_with(|| a.value.cmp(&b.value))
        })
        .cloned();

    DocumentAmounts { total, all_amounts }
}

/// Parse a locally formatted amount ("1.234,56", "1 234,56", "1,234.56" or "250.5").
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Whichever separator comes last is the decimal one
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(c), None) => {
            if cleaned.matches(',').count() == 1 && cleaned.len() - c - 1 != 3 {
                cleaned.replace(',', ".")
            } else {
                // "1,234" or "1,234,567" read as thousands groups
                cleaned.replace(',', "")
            }
        }
        (None, Some(d)) => {
            let thousands_group = cleaned.len() - d - 1 == 3 && d > 0 && &cleaned[..d] != "0";
            if cleaned.matches('.').count() > 1 || thousands_group {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    Decimal::from_str(&normalized).ok()
}

/// Whether the span is part of a date such as `15.03.2024`.
fn embedded_in_date(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let mut after = text[end..].chars();
    let after_sep = after.next();
    let after_digit = after.next();

    let preceded = matches!(before, Some(c) if c.is_ascii_digit() || c == '.' || c == '/');
    let followed = matches!(after_sep, Some('.') | Some('/') | Some('-'))
        && matches!(after_digit, Some(c) if c.is_ascii_digit());

    preceded || followed
}
