//! Supplier name and contact block extraction from the document header.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::SupplierContact;

use super::patterns::{
    ADDRESS_LINE, DATE_SHAPED, EMAIL, PHONE, PHONE_LABELED, POSTAL_CODE, TAX_ID, WEBSITE,
    WEBSITE_LABELED,
};

/// Number of leading non-empty lines treated as the letterhead.
pub const HEADER_LINES: usize = 8;

/// Lines starting with these words are structure, not a company name.
const STRUCTURAL_PREFIXES: &[&str] = &[
    "datum", "date", "ukupno", "total", "iznos", "za platiti", "faktura", "račun", "racun",
    "invoice", "ponuda", "predračun", "predracun", "quote", "knjižno", "credit", "broj", "br.",
    "pdv", "vat", "rok", "kupac", "customer", "page", "strana", "tel", "fax", "e-mail", "email",
];

lazy_static! {
    static ref CURRENCY_MARK: Regex = Regex::new(r"[€$£]|\b(?:KM|BAM|EUR|USD|RSD)\b").unwrap();
    static ref BARE_AMOUNT: Regex = Regex::new(r"^[-+]?\s*\d[\d\s.,]*$").unwrap();
    static ref ADDRESS_LABELED: Regex =
        Regex::new(r"(?i)\b(?:adresa|address|sjedište|sjediste|sedište)\s*:\s*([^\n]+)").unwrap();
}

fn header_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(HEADER_LINES)
}

/// Whether a line can be the supplier's name.
pub fn is_name_candidate(line: &str) -> bool {
    let line = line.trim();
    let len = line.chars().count();
    if len <= 3 || len >= 100 {
        return false;
    }
    if line.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    if CURRENCY_MARK.is_match(line) || BARE_AMOUNT.is_match(line) || DATE_SHAPED.is_match(line) {
        return false;
    }

    let lower = line.to_lowercase();
    !STRUCTURAL_PREFIXES.iter().any(|p| lower.starts_with(p))
}

/// First letterhead line that looks like a company name.
pub fn extract_supplier_name(text: &str) -> Option<String> {
    header_lines(text)
        .find(|line| is_name_candidate(line))
        .map(str::to_string)
}

/// Contact details: address from the letterhead, the rest from anywhere.
pub fn extract_supplier_contact(text: &str) -> SupplierContact {
    let mut contact = SupplierContact {
        email: EMAIL.find(text).map(|m| m.as_str().to_lowercase()),
        ..Default::default()
    };

    contact.website = WEBSITE
        .captures(text)
        .or_else(|| WEBSITE_LABELED.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(['.', ',']).to_lowercase());

    contact.phone = PHONE_LABELED
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|p| p.chars().filter(char::is_ascii_digit).count() >= 6)
        .or_else(|| PHONE.find(text).map(|m| m.as_str()))
        .map(|p| p.trim().to_string());

    contact.tax_id = TAX_ID
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('-').to_string())
        .find(|id| id.chars().any(|c| c.is_ascii_digit()));

    contact.address = header_lines(text)
        .find(|line| is_address_line(line))
        .map(str::to_string)
        .or_else(|| {
            ADDRESS_LABELED
                .captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        });

    if let Some(address) = &contact.address {
        let (city, country) = split_address(address);
        contact.city = city;
        contact.country = country;
    }

    contact
}

fn is_address_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    if line.contains('@') || lower.contains("www.") || lower.starts_with("tel") {
        return false;
    }
    if TAX_ID.is_match(line) || DATE_SHAPED.is_match(line) {
        return false;
    }
    ADDRESS_LINE.is_match(line) || has_postal_code_and_place(line)
}

fn has_postal_code_and_place(line: &str) -> bool {
    POSTAL_CODE.find_iter(line).any(|m| {
        line[m.end()..]
            .trim_start()
            .chars()
            .next()
            .is_some_and(char::is_alphabetic)
    })
}

/// City and country from the trailing comma segments of an address.
fn split_address(address: &str) -> (Option<String>, Option<String>) {
    let segments: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let place = |segment: &str| -> Option<String> {
        let name = segment
            .trim_start_matches(|c: char| c.is_ascii_digit() || c.is_whitespace() || c == '-')
            .trim();
        (!name.is_empty() && name.chars().any(char::is_alphabetic)).then(|| name.to_string())
    };

    match segments.as_slice() {
        [.., city, country] if segments.len() >= 3 => (place(*city), place(*country)),
        [_, city] => (place(*city), None),
        _ => (None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HEADER: &str = "\
15.03.2024
FAKTURA br. 12/2024
Elektro Bosna d.o.o.
Zmaja od Bosne 12, 71000 Sarajevo, BiH
Tel: +387 33 123 456
E-mail: Info@ElektroBosna.ba
www.elektrobosna.ba
PDV broj: 200123450009
Ukupno: 117,00 KM";

    #[test]
    fn test_supplier_name_skips_structure() {
        assert_eq!(extract_supplier_name(HEADER), Some("Elektro Bosna d.o.o.".to_string()));
    }

    #[test]
    fn test_name_candidate_filters() {
        assert!(is_name_candidate("Acme Trade d.o.o."));
        assert!(!is_name_candidate("Abc"));
        assert!(!is_name_candidate("12 Main Street"));
        assert!(!is_name_candidate("Cijena 100 KM"));
        assert!(!is_name_candidate("Ukupno za platiti"));
        assert!(!is_name_candidate("Datum: 01.01.2024"));
        assert!(!is_name_candidate(&"x".repeat(120)));
    }

    #[test]
    fn test_no_candidate_in_header() {
        let text = "1\n2\n3\n4\n5\n6\n7\n8\nLate Company Name";
        assert_eq!(extract_supplier_name(text), None);
    }

    #[test]
    fn test_contact_block() {
        let contact = extract_supplier_contact(HEADER);

        assert_eq!(contact.email.as_deref(), Some("info@elektrobosna.ba"));
        assert_eq!(contact.website.as_deref(), Some("www.elektrobosna.ba"));
        assert_eq!(contact.phone.as_deref(), Some("+387 33 123 456"));
        assert_eq!(contact.tax_id.as_deref(), Some("200123450009"));
        assert_eq!(
            contact.address.as_deref(),
            Some("Zmaja od Bosne 12, 71000 Sarajevo, BiH")
        );
        assert_eq!(contact.city.as_deref(), Some("Sarajevo"));
        assert_eq!(contact.country.as_deref(), Some("BiH"));
    }

    #[test]
    fn test_labeled_address_fallback() {
        let contact = extract_supplier_contact("Acme\nx\nx\nx\nx\nx\nx\nx\nAdresa: Titova 5, Mostar");
        assert_eq!(contact.address.as_deref(), Some("Titova 5, Mostar"));
        assert_eq!(contact.city.as_deref(), Some("Mostar"));
        assert_eq!(contact.country, None);
    }
}
