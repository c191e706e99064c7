//! Document type detection.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::DocumentType;

lazy_static! {
    // Leftmost match wins, so the heading of the document decides.
    static ref DOCUMENT_KEYWORD: Regex = Regex::new(
        r"(?i)\b(?:(knji[žz]no\s+odobrenje|credit\s+note|credit)|(predra[čc]un|ponud|quot(?:e|ation))|(faktur|ra[čc]un|invoice))"
    ).unwrap();
}

/// Type named by the earliest document keyword, if any.
pub fn detect_document_type(text: &str) -> Option<DocumentType> {
    let caps = DOCUMENT_KEYWORD.captures(text)?;
    if caps.get(1).is_some() {
        Some(DocumentType::CreditNote)
    } else if caps.get(2).is_some() {
        Some(DocumentType::Quote)
    } else {
        Some(DocumentType::Invoice)
    }
}

/// Document type, defaulting to invoice.
pub fn extract_document_type(text: &str) -> DocumentType {
    detect_document_type(text).unwrap_or_default()
}
