//! VAT rate extraction.

use rust_decimal::{Decimal, RoundingStrategy};

use super::amounts::parse_amount;
use super::patterns::VAT_PERCENT;
use super::{ExtractionMatch, FieldExtractor};

/// VAT rate extractor. Rates are percentages in 0..=100.
pub struct VatExtractor;

impl VatExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for VatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for VatExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();

        for caps in VAT_PERCENT.captures_iter(text) {
            let Some(rate) = caps.get(1) else { continue };
            let Some(value) = parse_amount(rate.as_str()).filter(|r| is_valid_rate(*r)) else {
                continue;
            };
            if results.iter().any(|m| m.value == value) {
                continue;
            }
            results.push(
                ExtractionMatch::new(value, 0.9, &caps[0]).with_position(rate.start(), rate.end()),
            );
        }

        results
    }
}

pub fn is_valid_rate(rate: Decimal) -> bool {
    rate >= Decimal::ZERO && rate <= Decimal::ONE_HUNDRED
}

/// First VAT percentage written next to a VAT keyword.
pub fn extract_vat_rate(text: &str) -> Option<Decimal> {
    VatExtractor::new().extract(text).map(|m| m.value)
}

/// VAT rate implied by the two amounts, rounded to a whole percent.
pub fn derive_vat_rate(subtotal: Decimal, total: Decimal) -> Option<Decimal> {
    if subtotal <= Decimal::ZERO || total < subtotal {
        return None;
    }
    let rate = ((total / subtotal - Decimal::ONE) * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    is_valid_rate(rate).then_some(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_extract_vat_rate() {
        assert_eq!(extract_vat_rate("PDV 17%: 170,00"), Some(Decimal::from(17)));
        assert_eq!(extract_vat_rate("VAT (20 %)"), Some(Decimal::from(20)));
        assert_eq!(extract_vat_rate("Stopa poreza 25,5 %"), Some(Decimal::from_str("25.5").unwrap()));
        assert_eq!(extract_vat_rate("Popust 10%"), None);
    }

    #[test]
    fn test_derive_vat_rate() {
        let rate = derive_vat_rate(Decimal::from(1000), Decimal::from(1170));
        assert_eq!(rate, Some(Decimal::from(17)));

        let rate = derive_vat_rate(Decimal::from_str("85.47").unwrap(), Decimal::from(100));
        assert_eq!(rate, Some(Decimal::from(17)));

        assert_eq!(derive_vat_rate(Decimal::ZERO, Decimal::from(10)), None);
        assert_eq!(derive_vat_rate(Decimal::from(10), Decimal::from(5)), None);
    }
}
