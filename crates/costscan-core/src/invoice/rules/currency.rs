//! Currency detection.

use crate::models::Currency;

use super::patterns::{CURRENCY_AFTER_AMOUNT, CURRENCY_TOKEN};
use super::{ExtractionMatch, FieldExtractor};

/// Currency extractor. Codes written right after an amount rank above bare codes.
pub struct CurrencyExtractor;

impl CurrencyExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CurrencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CurrencyExtractor {
    type Output = ExtractionMatch<Currency>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for (pattern, confidence) in [(&*CURRENCY_AFTER_AMOUNT, 0.95), (&*CURRENCY_TOKEN, 0.7)] {
            for caps in pattern.captures_iter(text) {
                let Some(code) = caps.get(1) else { continue };
                if let Some(currency) = Currency::parse(code.as_str()) {
                    results.push(
                        ExtractionMatch::new(currency, confidence, code.as_str())
                            .with_position(code.start(), code.end()),
                    );
                }
            }
        }

        results
    }
}

/// First currency found in the text, if any.
pub fn detect_currency(text: &str) -> Option<Currency> {
    CurrencyExtractor::new().extract(text).map(|m| m.value)
}

/// Currency of the document, BAM when nothing is written.
pub fn extract_currency(text: &str) -> Currency {
    detect_currency(text).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_after_amount_wins() {
        let text = "Kurs USD 1,80\nUkupno: 100,00 EUR";
        assert_eq!(detect_currency(text), Some(Currency::Eur));
    }

    #[test]
    fn test_bare_currency_token() {
        assert_eq!(detect_currency("Plaćanje u RSD"), Some(Currency::Rsd));
        assert_eq!(detect_currency("usd only"), Some(Currency::Usd));
    }

    #[test]
    fn test_no_currency_defaults_to_bam() {
        assert_eq!(detect_currency("Ukupno: 100,00"), None);
        assert_eq!(extract_currency("Ukupno: 100,00"), Currency::Bam);
    }

    #[test]
    fn test_code_inside_word_is_ignored() {
        assert_eq!(detect_currency("EUROPA trgovina"), None);
    }
}
