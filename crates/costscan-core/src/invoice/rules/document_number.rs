//! Document number extraction by candidate scoring.

use tracing::debug;

use super::labels::label_values;
use super::patterns::{DATE_SHAPED, DOCUMENT_NUMBER, TAX_ID};
use super::{ExtractionMatch, FieldExtractor};

/// Score a document number candidate. Non-positive scores are rejected.
///
/// Digits earn 5 points each (up to 6 digits), a separator 15 and a mix of
/// letters and digits 10. Date-shaped and purely alphabetic tokens score 0.
/// Lengths outside 3..=30 lose 20 points and lengths above 50 another 30.
pub fn score_document_number(candidate: &str) -> i32 {
    let candidate = candidate.trim();
    if candidate.is_empty() || DATE_SHAPED.is_match(candidate) {
        return 0;
    }

    let digits = candidate.chars().filter(char::is_ascii_digit).count();
    let has_letters = candidate.chars().any(char::is_alphabetic);
    if digits == 0 {
        return 0;
    }

    let mut score = digits.min(6) as i32 * 5;
    if candidate.contains(['/', '-', '.', '_']) {
        score += 15;
    }
    if has_letters {
        score += 10;
    }

    let len = candidate.chars().count();
    if !(3..=30).contains(&len) {
        score -= 20;
    }
    if len > 50 {
        score -= 30;
    }

    score
}

/// Scoring document number extractor over configured and built-in labels.
pub struct DocumentNumberExtractor {
    labels: Vec<String>,
}

impl DocumentNumberExtractor {
    pub fn new(labels: &[String]) -> Self {
        Self {
            labels: labels.to_vec(),
        }
    }
}

impl Default for DocumentNumberExtractor {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl FieldExtractor for DocumentNumberExtractor {
    type Output = ExtractionMatch<String>;

    /// Highest-scoring candidate; the earliest one wins ties.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        let mut best: Option<Self::Output> = None;
        for candidate in self.extract_all(text) {
            if best.as_ref().is_none_or(|b| candidate.confidence > b.confidence) {
                best = Some(candidate);
            }
        }
        best
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut candidates = label_values(text, &self.labels);

        // "ID broj", "PDV broj" and friends carry tax ids, not document numbers
        let tax_ids: Vec<(usize, usize)> = TAX_ID
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| (m.start(), m.end())))
            .collect();

        for caps in DOCUMENT_NUMBER.captures_iter(text) {
            let Some(token) = caps.get(1) else { continue };
            if tax_ids.iter().any(|&(start, end)| token.start() < end && start < token.end()) {
                debug!("Skipping tax id '{}' as document number", token.as_str());
                continue;
            }
            candidates.push(
                ExtractionMatch::new(token.as_str().to_string(), 0.0, &caps[0])
                    .with_position(token.start(), token.end()),
            );
        }

        candidates
            .into_iter()
            .filter_map(|mut candidate| {
                let score = score_document_number(&candidate.value);
                debug!("Document number candidate '{}' scored {}", candidate.value, score);
                if score <= 0 {
                    return None;
                }
                candidate.confidence = (score as f32 / 65.0).min(1.0);
                Some(candidate)
            })
            .collect()
    }
}

/// Best document number found under `labels` or the built-in labels.
pub fn extract_document_number(text: &str, labels: &[String]) -> Option<String> {
    DocumentNumberExtractor::new(labels)
        .extract(text)
        .map(|m| m.value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoring() {
        assert_eq!(score_document_number("2024-0042"), 6 * 5 + 15);
        assert_eq!(score_document_number("FA-12/2024"), 6 * 5 + 15 + 10);
        assert_eq!(score_document_number("12"), 2 * 5 - 20);
        assert_eq!(score_document_number("ABCDEF"), 0);
        assert_eq!(score_document_number("15.03.2024"), 0);
        assert_eq!(score_document_number("2024-03-15"), 0);
    }

    #[test]
    fn test_long_candidates_penalized() {
        let long = "A1".repeat(30);
        assert_eq!(score_document_number(&long), 6 * 5 + 10 - 20 - 30);
    }

    #[test]
    fn test_highest_score_wins() {
        let text = "Broj: 7\nRačun br. FA-12/2024";
        assert_eq!(extract_document_number(text, &[]), Some("FA-12/2024".to_string()));
    }

    #[test]
    fn test_date_never_selected() {
        let labels = vec!["Broj dokumenta".to_string()];
        assert_eq!(extract_document_number("Broj dokumenta: 15.03.2024", &labels), None);
        assert_eq!(extract_document_number("Faktura br. 15.03.2024", &[]), None);
    }

    #[test]
    fn test_configured_label() {
        let labels = vec!["Ref".to_string()];
        assert_eq!(
            extract_document_number("Ref: INV-99812", &labels),
            Some("INV-99812".to_string())
        );
    }

    #[test]
    fn test_full_broj_label() {
        assert_eq!(
            extract_document_number("Račun broj: 2024-001", &[]),
            Some("2024-001".to_string())
        );
        assert_eq!(
            extract_document_number("FAKTURA BROJ 117/24", &[]),
            Some("117/24".to_string())
        );
        assert_eq!(
            extract_document_number("Faktura br.58-2024", &[]),
            Some("58-2024".to_string())
        );
    }

    #[test]
    fn test_tax_id_is_not_a_document_number() {
        let text = "ID broj: 4200123450009\nFaktura br. 117";
        assert_eq!(extract_document_number(text, &[]), Some("117".to_string()));

        let text = "PDV broj: 200123450009\nRačun broj: 15/2024";
        assert_eq!(extract_document_number(text, &[]), Some("15/2024".to_string()));

        assert_eq!(extract_document_number("JIB: 4200123450009", &[]), None);
    }
}
