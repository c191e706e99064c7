//! Rule-based field extractors for cost documents.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod document_number;
pub mod document_type;
pub mod labels;
pub mod patterns;
pub mod supplier;
pub mod vat;

pub use amounts::{extract_amounts, parse_amount, AmountExtractor, DocumentAmounts};
pub use currency::{detect_currency, extract_currency, CurrencyExtractor};
pub use dates::{extract_dates, offset_date, parse_date, DateExtractor, DateResolution, LabeledDates};
pub use document_number::{extract_document_number, score_document_number, DocumentNumberExtractor};
pub use document_type::{detect_document_type, extract_document_type};
pub use labels::{
    label_amounts, label_dates, label_pattern, label_percentages, label_text, label_values,
};
pub use supplier::{extract_supplier_contact, extract_supplier_name, is_name_candidate};
pub use vat::{derive_vat_rate, extract_vat_rate, VatExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// An extraction candidate with its confidence.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Byte span of the value in the source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched, or the label that anchored it.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
