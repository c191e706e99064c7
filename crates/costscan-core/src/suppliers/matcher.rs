//! Supplier matching against the host's directory.
//!
//! Every supplier is scored against the recognized text with weighted exact
//! and fuzzy matches on its identity fields. Suppliers whose name collides with
//! the user's own company are never returned, so the letterhead of an outgoing
//! document cannot match as a supplier.

use serde::Serialize;
use tracing::debug;

use crate::invoice::{normalize, transliterate};
use crate::models::{CompanyInfo, SupplierRecord};

use super::similarity::{best_similarity, similarity};

const NAME_EXACT: f64 = 150.0;
const NAME_WORDS: f64 = 80.0;
const TAX_ID_EXACT: f64 = 100.0;
const ADDRESS_EXACT: f64 = 60.0;
const EMAIL_EXACT: f64 = 50.0;
const PHONE_EXACT: f64 = 40.0;
const WEBSITE_EXACT: f64 = 30.0;

/// Similarity at which an AI-reported name is taken as a known supplier.
pub const VERIFIED_NAME_SIMILARITY: f64 = 85.0;

/// Characters dropped from phone numbers before comparison.
const PHONE_SEPARATORS: &[char] = &[' ', '-', '/', '.', '(', ')', '+'];

/// One identity field that contributed to a supplier's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedField {
    pub field: &'static str,
    /// Exact substring match rather than fuzzy similarity.
    pub exact: bool,
    pub points: f64,
}

/// The best supplier for a document.
#[derive(Debug, Clone, Serialize)]
pub struct SupplierMatch {
    pub supplier: SupplierRecord,
    pub score: f64,
    pub matched_fields: Vec<MatchedField>,
}

/// Weighted supplier scorer.
pub struct SupplierMatcher {
    threshold: f64,
}

impl SupplierMatcher {
    pub fn new() -> Self {
        Self { threshold: 30.0 }
    }

    /// Minimum score a candidate must exceed.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Highest-scoring supplier above the threshold, if any.
    pub fn find_best(
        &self,
        text: &str,
        suppliers: &[SupplierRecord],
        company: &CompanyInfo,
    ) -> Option<SupplierMatch> {
        let text = DocumentText::new(text);
        let own_identity = company.identity_values();

        let mut best: Option<SupplierMatch> = None;
        for supplier in suppliers {
            if is_own_company(supplier, &own_identity) {
                debug!("Skipping supplier '{}': matches own company", supplier.name);
                continue;
            }

            let matched_fields = score_supplier(supplier, &text);
            let score: f64 = matched_fields.iter().map(|f| f.points).sum();
            if matched_fields.is_empty() || score <= self.threshold {
                continue;
            }

            debug!(
                "Supplier '{}' scored {:.1} on {:?}",
                supplier.name,
                score,
                matched_fields.iter().map(|f| f.field).collect::<Vec<_>>()
            );

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(SupplierMatch {
                    supplier: supplier.clone(),
                    score,
                    matched_fields,
                });
            }
        }

        best
    }
}

impl Default for SupplierMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Find the directory entry for a supplier name reported by the model:
/// case-insensitive equality, containment either way, or high similarity.
/// Entries that collide with the own company are never returned.
pub fn verify_supplier_name<'a>(
    name: &str,
    suppliers: &'a [SupplierRecord],
    company: &CompanyInfo,
) -> Option<&'a SupplierRecord> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }

    let own_identity = company.identity_values();
    let candidates: Vec<(&SupplierRecord, String)> = suppliers
        .iter()
        .filter(|s| !is_own_company(s, &own_identity))
        .filter_map(|s| {
            let known = s.name.trim().to_lowercase();
            (!known.is_empty()).then_some((s, known))
        })
        .collect();

    candidates
        .iter()
        .find(|(_, k)| *k == name)
        .or_else(|| {
            candidates
                .iter()
                .find(|(_, k)| k.contains(&name) || name.contains(k.as_str()))
        })
        .map(|(s, _)| *s)
        .or_else(|| {
            candidates
                .iter()
                .map(|(s, k)| (*s, similarity(k, &name)))
                .filter(|(_, score)| *score >= VERIFIED_NAME_SIMILARITY)
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(s, _)| s)
        })
}

fn is_own_company(supplier: &SupplierRecord, own_identity: &[String]) -> bool {
    let name = supplier.name.trim().to_lowercase();
    !name.is_empty()
        && own_identity
            .iter()
            .any(|value| name.contains(value.as_str()) || value.contains(name.as_str()))
}

/// Lowercased views of the document text.
///
/// Exact lookups try both views: normalization splits tokens such as
/// `shop24hr@market.ba`, which directory values keep whole.
struct DocumentText {
    normalized: String,
    plain: String,
}

impl DocumentText {
    fn new(text: &str) -> Self {
        Self {
            normalized: normalize(text).to_lowercase(),
            plain: transliterate(text).to_lowercase(),
        }
    }

    fn contains(&self, value: &str) -> bool {
        self.normalized.contains(value) || self.plain.contains(value)
    }

    fn similarity(&self, value: &str) -> f64 {
        best_similarity(value, &self.normalized).max(best_similarity(value, &self.plain))
    }
}

fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn exact(field: &'static str, points: f64) -> MatchedField {
    MatchedField { field, exact: true, points }
}

fn fuzzy(field: &'static str, points: f64) -> MatchedField {
    MatchedField { field, exact: false, points }
}

fn score_supplier(supplier: &SupplierRecord, text: &DocumentText) -> Vec<MatchedField> {
    let mut matched = Vec::new();

    let name = supplier.name.trim().to_lowercase();
    if !name.is_empty() {
        if text.contains(&name) {
            matched.push(exact("name", NAME_EXACT));
        } else {
            let score = text.similarity(&name);
            if score >= 60.0 {
                matched.push(fuzzy("name", 2.0 * score));
            } else if name_words_present(&name, &text.normalized) {
                matched.push(fuzzy("name_words", NAME_WORDS));
            }
        }
    }

    if let Some(tax_id) = present(&supplier.tax_id) {
        if text.contains(&tax_id) {
            matched.push(exact("tax_id", TAX_ID_EXACT));
        } else {
            let score = text.similarity(&tax_id);
            if score >= 80.0 {
                matched.push(fuzzy("tax_id", 1.5 * score));
            }
        }
    }

    if let Some(address) = present(&supplier.address) {
        if address.chars().count() > 5 && text.contains(&address) {
            matched.push(exact("address", ADDRESS_EXACT));
        } else {
            let score = text.similarity(&address);
            if score >= 65.0 {
                matched.push(fuzzy("address", 0.8 * score));
            }
        }
    }

    if let Some(city) = present(&supplier.city) {
        let score = text.similarity(&city);
        if score >= 75.0 {
            matched.push(fuzzy("city", 0.6 * score));
        }
    }

    if let Some(email) = present(&supplier.email) {
        if text.contains(&email) {
            matched.push(exact("email", EMAIL_EXACT));
        }
    }

    if let Some(phone) = supplier.phone.as_deref().map(strip_phone) {
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        if digits >= 6 && strip_phone(&text.plain).contains(&phone) {
            matched.push(exact("phone", PHONE_EXACT));
        }
    }

    if let Some(website) = present(&supplier.website).map(|w| strip_scheme(&w)) {
        if !website.is_empty() && text.contains(&website) {
            matched.push(exact("website", WEBSITE_EXACT));
        }
    }

    if let Some(person) = present(&supplier.contact_person) {
        let score = text.similarity(&person);
        if score >= 75.0 {
            matched.push(fuzzy("contact_person", 0.5 * score));
        }
    }

    matched
}

/// At least 60% of the name's significant words (longer than two characters)
/// appear somewhere in the text.
fn name_words_present(name: &str, text: &str) -> bool {
    let words: Vec<&str> = name
        .split_whitespace()
        .filter(|w| w.chars().count() > 2)
        .collect();
    if words.is_empty() {
        return false;
    }
    let found = words.iter().filter(|w| text.contains(*w)).count();
    found as f64 / words.len() as f64 >= 0.6
}

fn strip_phone(value: &str) -> String {
    value.chars().filter(|c| !PHONE_SEPARATORS.contains(c)).collect()
}

fn strip_scheme(url: &str) -> String {
    url.trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directory() -> Vec<SupplierRecord> {
        vec![
            SupplierRecord {
                tax_id: Some("4200123450009".to_string()),
                email: Some("info@elektrobosna.ba".to_string()),
                city: Some("Sarajevo".to_string()),
                ..SupplierRecord::new("1", "Elektro Bosna d.o.o.")
            },
            SupplierRecord {
                phone: Some("+387 51 222 333".to_string()),
                website: Some("https://www.telekom-srpske.com/".to_string()),
                ..SupplierRecord::new("2", "Telekom Srpske a.d.")
            },
            SupplierRecord::new("3", "Moja Firma d.o.o."),
        ]
    }

    fn own_company() -> CompanyInfo {
        CompanyInfo {
            name: Some("Moja Firma".to_string()),
            tax_id: Some("4209999990001".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_exact_name_and_tax_id() {
        let text = "ELEKTRO BOSNA d.o.o.\nJIB: 4200123450009\nSarajevo";
        let found = SupplierMatcher::new()
            .find_best(text, &directory(), &own_company())
            .unwrap();

        assert_eq!(found.supplier.id, "1");
        assert!(found.score >= 250.0);
        assert!(found.matched_fields.iter().any(|f| f.field == "tax_id" && f.exact));
    }

    #[test]
    fn test_contact_details_only() {
        let text = "Racun za usluge\nwww.telekom-srpske.com\nTel 051/222-333";
        let found = SupplierMatcher::new()
            .find_best(text, &directory(), &CompanyInfo::default())
            .unwrap();

        assert_eq!(found.supplier.id, "2");
        let fields: Vec<&str> = found.matched_fields.iter().map(|f| f.field).collect();
        assert!(fields.contains(&"website"));
    }

    #[test]
    fn test_fuzzy_name() {
        let text = "Elektr0 Bosna d.o.o\nUkupno 117,00";
        let found = SupplierMatcher::new()
            .find_best(text, &directory(), &CompanyInfo::default())
            .unwrap();
        assert_eq!(found.supplier.id, "1");
        assert!(!found.matched_fields[0].exact);
    }

    #[test]
    fn test_own_company_never_matched() {
        let text = "Moja Firma d.o.o.\nKupac: Moja Firma d.o.o.\n4209999990001";
        let found = SupplierMatcher::new().find_best(text, &directory(), &own_company());
        assert!(found.is_none());
    }

    #[test]
    fn test_own_company_excluded_even_when_best() {
        let mut suppliers = directory();
        suppliers[2].tax_id = Some("4209999990001".to_string());
        let text = "Moja Firma d.o.o. 4209999990001\nElektro Bosna";

        let found = SupplierMatcher::new()
            .find_best(text, &suppliers, &own_company())
            .unwrap();
        assert_eq!(found.supplier.id, "1");
    }

    #[test]
    fn test_below_threshold() {
        let company = CompanyInfo::default();
        let found = SupplierMatcher::new().find_best("Plaćeno gotovinom", &directory(), &company);
        assert!(found.is_none());

        // A city match alone clears the default threshold
        let text = "Sarajevo, 15.03.2024";
        assert!(SupplierMatcher::new().find_best(text, &directory(), &company).is_some());
        let strict = SupplierMatcher::new().with_threshold(100.0);
        assert!(strict.find_best(text, &directory(), &company).is_none());
    }

    #[test]
    fn test_verify_supplier_name() {
        let suppliers = directory();
        let company = own_company();
        let verify = |name: &str| verify_supplier_name(name, &suppliers, &company).map(|s| s.id.clone());

        assert_eq!(verify("elektro bosna d.o.o.").as_deref(), Some("1"));
        assert_eq!(verify("Telekom Srpske").as_deref(), Some("2"));
        assert_eq!(verify("Elektro Bosna d.o.0.").as_deref(), Some("1"));
        assert_eq!(verify("Vodovod Mostar"), None);
        assert_eq!(verify("  "), None);
    }

    #[test]
    fn test_verify_skips_own_company() {
        let suppliers = directory();
        assert!(verify_supplier_name("Moja Firma d.o.o.", &suppliers, &own_company()).is_none());
        assert_eq!(
            verify_supplier_name("Moja Firma d.o.o.", &suppliers, &CompanyInfo::default())
                .map(|s| s.id.as_str()),
            Some("3")
        );
    }

    #[test]
    fn test_contact_tokens_with_digits_and_letters() {
        let suppliers = vec![SupplierRecord {
            email: Some("shop24hr@market.ba".to_string()),
            website: Some("www.shop24hr.ba".to_string()),
            ..SupplierRecord::new("7", "Market Centar")
        }];
        let text = "Kontakt: shop24hr@market.ba";
        let found = SupplierMatcher::new()
            .find_best(text, &suppliers, &CompanyInfo::default())
            .unwrap();

        assert_eq!(found.supplier.id, "7");
        assert!(found.matched_fields.iter().any(|f| f.field == "email" && f.exact));
    }
}
