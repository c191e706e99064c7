//! Canonical suggestion set and recognition results.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Engine identifier suffix marking a degraded, error-state result.
pub const ERROR_ENGINE_SUFFIX: &str = "-error";

/// Confidence assigned to degraded results.
pub const DEGRADED_CONFIDENCE: f32 = 0.1;

/// Kind of cost document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Invoice (faktura, račun).
    #[default]
    Invoice,
    /// Quote (ponuda, predračun).
    Quote,
    /// Credit note (knjižno odobrenje).
    CreditNote,
    /// Anything else.
    Other,
}

impl DocumentType {
    /// Parse a model- or user-supplied document type name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "invoice" => Some(Self::Invoice),
            "quote" => Some(Self::Quote),
            "credit_note" | "creditnote" => Some(Self::CreditNote),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Quote => "quote",
            Self::CreditNote => "credit_note",
            Self::Other => "other",
        }
    }
}

/// Supported document currencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Bosnia and Herzegovina convertible mark (KM).
    #[default]
    Bam,
    Eur,
    Usd,
    /// Serbian dinar.
    Rsd,
}

impl Currency {
    /// Parse an ISO code or a common local symbol.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BAM" | "KM" => Some(Self::Bam),
            "EUR" | "€" => Some(Self::Eur),
            "USD" | "$" => Some(Self::Usd),
            "RSD" | "DIN" | "DIN." => Some(Self::Rsd),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Bam => "BAM",
            Self::Eur => "EUR",
            Self::Usd => "USD",
            Self::Rsd => "RSD",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Supplier contact details found on the document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Tax identification number (PDV/ID/JIB/PIB).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
}

impl SupplierContact {
    /// Check if no contact detail is present.
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.country.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.website.is_none()
            && self.tax_id.is_none()
    }

    /// Fill every missing detail from `other`.
    pub fn fill_from(&mut self, other: SupplierContact) {
        self.address = self.address.take().or(other.address);
        self.city = self.city.take().or(other.city);
        self.country = self.country.take().or(other.country);
        self.phone = self.phone.take().or(other.phone);
        self.email = self.email.take().or(other.email);
        self.website = self.website.take().or(other.website);
        self.tax_id = self.tax_id.take().or(other.tax_id);
    }
}

/// The canonical suggestion set handed to the form layer.
///
/// Every field is always present; absent suggestions are `None`, and
/// `document_type`, `currency` and `vat_rate` fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub supplier_name: Option<String>,

    pub document_type: DocumentType,

    /// Amount before tax.
    pub subtotal_tax_excluded: Option<Decimal>,

    /// Amount including tax.
    pub total_amount: Option<Decimal>,

    pub currency: Currency,

    pub issue_date: Option<NaiveDate>,

    pub due_date: Option<NaiveDate>,

    pub document_number: Option<String>,

    /// VAT rate as a percentage (17 means 17%).
    pub vat_rate: Decimal,

    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "SupplierContact::is_empty")]
    pub supplier: SupplierContact,
}

impl ExtractedFields {
    /// Names of the canonical fields that carry no suggestion.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.supplier_name.is_none() {
            missing.push("supplier_name");
        }
        if self.subtotal_tax_excluded.is_none() {
            missing.push("subtotal_tax_excluded");
        }
        if self.total_amount.is_none() {
            missing.push("total_amount");
        }
        if self.issue_date.is_none() {
            missing.push("issue_date");
        }
        if self.due_date.is_none() {
            missing.push("due_date");
        }
        if self.document_number.is_none() {
            missing.push("document_number");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        missing
    }
}

/// Output of a recognition backend for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Recognized text, or a diagnostic message for degraded results.
    pub raw_text: String,

    /// Confidence in [0, 1].
    pub confidence: f32,

    pub processing_time_ms: u64,

    /// Backend (and mode) that produced this result.
    pub engine_id: String,

    /// Direct structured parse, when the backend produced one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_guess: Option<ExtractedFields>,
}

impl RecognitionResult {
    pub fn new(raw_text: impl Into<String>, confidence: f32, engine_id: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            confidence: confidence.clamp(0.0, 1.0),
            processing_time_ms: 0,
            engine_id: engine_id.into(),
            structured_guess: None,
        }
    }

    /// A low-confidence result carrying a human-readable diagnostic.
    pub fn degraded(engine: &str, diagnostic: impl Into<String>) -> Self {
        Self::new(
            diagnostic,
            DEGRADED_CONFIDENCE,
            format!("{}{}", engine, ERROR_ENGINE_SUFFIX),
        )
    }

    pub fn with_processing_time(mut self, ms: u64) -> Self {
        self.processing_time_ms = ms;
        self
    }

    pub fn with_structured_guess(mut self, guess: Option<ExtractedFields>) -> Self {
        self.structured_guess = guess;
        self
    }

    /// Whether this result reports a backend failure.
    pub fn is_error_state(&self) -> bool {
        self.engine_id.ends_with(ERROR_ENGINE_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_parsing() {
        assert_eq!(DocumentType::parse("Invoice"), Some(DocumentType::Invoice));
        assert_eq!(DocumentType::parse("credit note"), Some(DocumentType::CreditNote));
        assert_eq!(DocumentType::parse("CREDIT_NOTE"), Some(DocumentType::CreditNote));
        assert_eq!(DocumentType::parse("receipt"), None);
    }

    #[test]
    fn test_currency_parsing() {
        assert_eq!(Currency::parse("km"), Some(Currency::Bam));
        assert_eq!(Currency::parse("eur"), Some(Currency::Eur));
        assert_eq!(Currency::parse("€"), Some(Currency::Eur));
        assert_eq!(Currency::parse("Din."), Some(Currency::Rsd));
        assert_eq!(Currency::parse("GBP"), None);
    }

    #[test]
    fn test_currency_serializes_uppercase() {
        let json = serde_json::to_string(&Currency::Bam).unwrap();
        assert_eq!(json, "\"BAM\"");
    }

    #[test]
    fn test_degraded_result() {
        let result = RecognitionResult::degraded("gemini", "API key missing");
        assert!(result.is_error_state());
        assert_eq!(result.engine_id, "gemini-error");
        assert_eq!(result.raw_text, "API key missing");
        assert!(result.structured_guess.is_none());
        assert!((result.confidence - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_fields() {
        let fields = ExtractedFields {
            total_amount: Some(Decimal::new(100, 0)),
            ..Default::default()
        };
        let missing = fields.missing_fields();
        assert!(!missing.contains(&"total_amount"));
        assert!(missing.contains(&"supplier_name"));
    }
}
